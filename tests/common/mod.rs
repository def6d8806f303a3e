#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc, sync::Mutex};

use async_trait::async_trait;

use spotplus::{
    config::{self, Settings},
    error::ApiError,
    session::Session,
    spotify::{RecommendationQuery, RepeatState, SpotifyApi, TimeRange, bare_id},
    types::{
        Album, Artist, AudioFeatures, Category, CurrentPlayback, CursorPage, Cursors, Device,
        Owner, Page, PlayHistory, PlaybackRequest, Playlist, PlaylistDetails, PlaylistItem, Queue,
        RecommendationSeed, Recommendations, SavedAlbum, SavedTrack, SearchKind, SearchResponse,
        Track, TracksRef, UserProfile,
    },
};

pub fn artist(id: &str, name: &str, genres: &[&str]) -> Artist {
    Artist {
        id: id.to_string(),
        name: name.to_string(),
        uri: format!("spotify:artist:{}", id),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ..Default::default()
    }
}

pub fn track(id: &str, name: &str, artist_name: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        uri: format!("spotify:track:{}", id),
        kind: "track".to_string(),
        duration_ms: 200_000,
        artists: vec![artist(&format!("{}-artist", id), artist_name, &[])],
        album: Album {
            id: format!("{}-album", id),
            name: format!("{} album", name),
            uri: format!("spotify:album:{}-album", id),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn playlist(id: &str, name: &str, owner_id: &str, total: u64) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: name.to_string(),
        uri: format!("spotify:playlist:{}", id),
        owner: Owner {
            id: owner_id.to_string(),
            display_name: owner_id.to_string(),
        },
        tracks: TracksRef { total },
        ..Default::default()
    }
}

pub fn device(id: &str, name: &str) -> Device {
    Device {
        id: Some(id.to_string()),
        name: name.to_string(),
        kind: "Computer".to_string(),
        ..Default::default()
    }
}

pub fn page<T: Clone>(items: &[T], limit: u32, offset: u32) -> Page<T> {
    let start = (offset as usize).min(items.len());
    let end = (start + limit as usize).min(items.len());
    Page {
        items: items[start..end].to_vec(),
        next: (end < items.len()).then(|| format!("offset={}", end)),
        total: items.len() as u64,
        limit,
        offset,
    }
}

/// In-memory stand-in for the Web API. Records every call by name and keeps
/// playlist contents so builder runs can be inspected afterwards.
#[derive(Default)]
pub struct FakeSpotify {
    pub calls: Mutex<Vec<String>>,
    pub profile: Mutex<UserProfile>,
    pub devices: Mutex<Vec<Device>>,
    pub playback: Mutex<Option<CurrentPlayback>>,
    pub top_tracks: Mutex<Vec<Track>>,
    pub top_artists: Mutex<Vec<Artist>>,
    pub followed: Mutex<Vec<Artist>>,
    /// Tracks returned per recommendation request.
    pub recommendation_size: Mutex<usize>,
    pub playlists: Mutex<Vec<Playlist>>,
    pub playlist_contents: Mutex<HashMap<String, Vec<String>>>,
    pub saved_tracks: Mutex<Vec<String>>,
    pub search_results: Mutex<HashMap<String, SearchResponse>>,
    pub categories: Mutex<Vec<Category>>,
    pub audio_features: Mutex<HashMap<String, AudioFeatures>>,
    pub fail_with: Mutex<Option<ApiError>>,
    /// Errors returned only by the named calls.
    pub failing_calls: Mutex<HashMap<String, ApiError>>,
    pub playback_requests: Mutex<Vec<PlaybackRequest>>,
}

impl FakeSpotify {
    pub fn new() -> Self {
        let fake = Self::default();
        *fake.profile.lock().unwrap() = UserProfile {
            id: "tester".to_string(),
            display_name: "Tester".to_string(),
            country: "DE".to_string(),
            product: "premium".to_string(),
            ..Default::default()
        };
        *fake.recommendation_size.lock().unwrap() = 20;
        fake
    }

    /// Fake with 99 top tracks and 60 top artists.
    pub fn with_listening_history() -> Self {
        let fake = Self::new();
        *fake.top_tracks.lock().unwrap() = (0..99)
            .map(|i| track(&format!("top{}", i), &format!("Top {}", i), "Someone"))
            .collect();
        *fake.top_artists.lock().unwrap() = (0..60)
            .map(|i| artist(&format!("a{}", i), &format!("Artist {}", i), &["rock", "indie"]))
            .collect();
        fake
    }

    fn record(&self, call: impl Into<String>) -> Result<(), ApiError> {
        let call = call.into();
        let name = call.split(':').next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(call);
        if let Some(e) = self.failing_calls.lock().unwrap().get(&name) {
            return Err(e.clone());
        }
        match self.fail_with.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail(&self, error: ApiError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    /// Fails only calls named `call`; everything else keeps working.
    pub fn fail_call(&self, call: &str, error: ApiError) {
        self.failing_calls
            .lock()
            .unwrap()
            .insert(call.to_string(), error);
    }

    pub fn contents(&self, playlist_id: &str) -> Vec<String> {
        self.playlist_contents
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_playing(&self, item: Track, context_uri: Option<&str>) {
        *self.playback.lock().unwrap() = Some(CurrentPlayback {
            is_playing: true,
            item: Some(item),
            context: context_uri.map(|uri| spotplus::types::Context {
                uri: uri.to_string(),
                kind: uri.split(':').nth(1).unwrap_or_default().to_string(),
            }),
            ..Default::default()
        });
    }
}

/// Connects a session over `fake` with every scope granted.
pub async fn session_with(fake: &Arc<FakeSpotify>, settings: Settings) -> Session {
    let client: Arc<dyn SpotifyApi> = fake.clone();
    Session::connect(client, &config::spotify_scope(), settings, None)
        .await
        .expect("session connects against the fake")
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    async fn me(&self) -> Result<UserProfile, ApiError> {
        self.record("me")?;
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn devices(&self) -> Result<Vec<Device>, ApiError> {
        self.record("devices")?;
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn current_playback(&self) -> Result<Option<CurrentPlayback>, ApiError> {
        self.record("current_playback")?;
        Ok(self.playback.lock().unwrap().clone())
    }

    async fn currently_playing(
        &self,
        _market: Option<&str>,
    ) -> Result<Option<CurrentPlayback>, ApiError> {
        self.record("currently_playing")?;
        Ok(self.playback.lock().unwrap().clone())
    }

    async fn top_artists(
        &self,
        limit: u32,
        offset: u32,
        _time_range: TimeRange,
    ) -> Result<Page<Artist>, ApiError> {
        self.record("top_artists")?;
        Ok(page(&self.top_artists.lock().unwrap(), limit, offset))
    }

    async fn top_tracks(
        &self,
        limit: u32,
        offset: u32,
        _time_range: TimeRange,
    ) -> Result<Page<Track>, ApiError> {
        self.record("top_tracks")?;
        Ok(page(&self.top_tracks.lock().unwrap(), limit, offset))
    }

    async fn followed_artists(
        &self,
        limit: u32,
        after: Option<String>,
    ) -> Result<CursorPage<Artist>, ApiError> {
        self.record("followed_artists")?;
        let followed = self.followed.lock().unwrap().clone();
        let start = after
            .and_then(|id| followed.iter().position(|a| a.id == id).map(|p| p + 1))
            .unwrap_or(0);
        let end = (start + limit as usize).min(followed.len());
        let items = followed[start..end].to_vec();
        let more = end < followed.len();
        Ok(CursorPage {
            cursors: Some(Cursors {
                after: items.last().filter(|_| more).map(|a| a.id.clone()),
            }),
            next: more.then(|| "next".to_string()),
            items,
            total: Some(followed.len() as u64),
        })
    }

    async fn saved_tracks(&self, limit: u32, offset: u32) -> Result<Page<SavedTrack>, ApiError> {
        self.record("saved_tracks")?;
        let saved: Vec<SavedTrack> = self
            .saved_tracks
            .lock()
            .unwrap()
            .iter()
            .map(|id| SavedTrack {
                track: track(bare_id(id), id, "Someone"),
                ..Default::default()
            })
            .collect();
        Ok(page(&saved, limit, offset))
    }

    async fn saved_albums(&self, limit: u32, offset: u32) -> Result<Page<SavedAlbum>, ApiError> {
        self.record("saved_albums")?;
        Ok(page(&[], limit, offset))
    }

    async fn artist(&self, id: &str) -> Result<Artist, ApiError> {
        self.record("artist")?;
        Ok(artist(bare_id(id), &format!("Artist {}", bare_id(id)), &[]))
    }

    async fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError> {
        self.record("artists")?;
        Ok(ids
            .iter()
            .map(|id| artist(bare_id(id), &format!("Seed {}", bare_id(id)), &[]))
            .collect())
    }

    async fn track(&self, id: &str) -> Result<Track, ApiError> {
        self.record("track")?;
        Ok(track(bare_id(id), &format!("Track {}", bare_id(id)), "Someone"))
    }

    async fn tracks(&self, ids: &[String]) -> Result<Vec<Track>, ApiError> {
        self.record("tracks")?;
        Ok(ids
            .iter()
            .map(|id| track(bare_id(id), &format!("Seed {}", bare_id(id)), "Someone"))
            .collect())
    }

    async fn artist_albums(
        &self,
        _id: &str,
        _market: Option<&str>,
        limit: u32,
    ) -> Result<Page<Album>, ApiError> {
        self.record("artist_albums")?;
        Ok(page(&[], limit, 0))
    }

    async fn artist_related_artists(&self, _id: &str) -> Result<Vec<Artist>, ApiError> {
        self.record("artist_related_artists")?;
        Ok(Vec::new())
    }

    async fn artist_top_tracks(
        &self,
        _id: &str,
        _market: Option<&str>,
    ) -> Result<Vec<Track>, ApiError> {
        self.record("artist_top_tracks")?;
        Ok(Vec::new())
    }

    async fn album_tracks(&self, id: &str) -> Result<Page<Track>, ApiError> {
        self.record("album_tracks")?;
        let tracks = vec![track(&format!("{}-1", bare_id(id)), "Opener", "Someone")];
        Ok(page(&tracks, 50, 0))
    }

    async fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, ApiError> {
        self.record("audio_features")?;
        let known = self.audio_features.lock().unwrap();
        Ok(ids.iter().map(|id| known.get(bare_id(id)).cloned()).collect())
    }

    async fn recommendations(
        &self,
        query: &RecommendationQuery,
    ) -> Result<Recommendations, ApiError> {
        self.record("recommendations")?;
        let key = query
            .seed_artists
            .first()
            .or(query.seed_tracks.first())
            .or(query.seed_genres.first())
            .cloned()
            .unwrap_or_default();
        let size = *self.recommendation_size.lock().unwrap();
        Ok(Recommendations {
            seeds: vec![RecommendationSeed {
                id: key.clone(),
                kind: "artist".to_string(),
                ..Default::default()
            }],
            tracks: (0..size)
                .map(|i| track(&format!("rec-{}-{}", key, i), &format!("Rec {}", i), "Someone"))
                .collect(),
        })
    }

    async fn genre_seeds(&self) -> Result<Vec<String>, ApiError> {
        self.record("genre_seeds")?;
        Ok(vec!["rock".to_string(), "jazz".to_string()])
    }

    async fn search(
        &self,
        query: &str,
        _kinds: &[SearchKind],
        _limit: u32,
        _market: Option<&str>,
    ) -> Result<SearchResponse, ApiError> {
        self.record("search")?;
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(&query.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn categories(
        &self,
        _market: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Category>, ApiError> {
        self.record("categories")?;
        Ok(page(&self.categories.lock().unwrap(), limit, offset))
    }

    async fn category_playlists(
        &self,
        _category_id: &str,
        _market: Option<&str>,
        limit: u32,
    ) -> Result<Page<Playlist>, ApiError> {
        self.record("category_playlists")?;
        Ok(page(&self.playlists.lock().unwrap(), limit, 0))
    }

    async fn current_user_playlists(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Playlist>, ApiError> {
        self.record("current_user_playlists")?;
        Ok(page(&self.playlists.lock().unwrap(), limit, offset))
    }

    async fn playlist(&self, id: &str) -> Result<Playlist, ApiError> {
        self.record("playlist")?;
        let id = bare_id(id);
        let mut found = self
            .playlists
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(ApiError::Remote {
                status: 404,
                reason: "Not found.".to_string(),
            })?;
        found.tracks.total = self.contents(id).len() as u64;
        Ok(found)
    }

    async fn playlist_items(
        &self,
        id: &str,
        limit: u32,
        offset: u32,
        _market: Option<&str>,
    ) -> Result<Page<PlaylistItem>, ApiError> {
        self.record("playlist_items")?;
        let items: Vec<PlaylistItem> = self
            .contents(bare_id(id))
            .iter()
            .map(|uri| PlaylistItem {
                added_at: None,
                track: Some(track(bare_id(uri), bare_id(uri), "Someone")),
            })
            .collect();
        Ok(page(&items, limit, offset))
    }

    async fn playlist_is_following(&self, _id: &str, _user_id: &str) -> Result<bool, ApiError> {
        self.record("playlist_is_following")?;
        Ok(true)
    }

    async fn create_playlist(
        &self,
        _user_id: &str,
        details: &PlaylistDetails,
    ) -> Result<Playlist, ApiError> {
        self.record("create_playlist")?;
        let mut playlists = self.playlists.lock().unwrap();
        let id = format!("created{}", playlists.len());
        let created = playlist(&id, &details.name, "tester", 0);
        playlists.push(created.clone());
        Ok(created)
    }

    async fn change_playlist_details(
        &self,
        _id: &str,
        _details: &PlaylistDetails,
    ) -> Result<(), ApiError> {
        self.record("change_playlist_details")
    }

    async fn add_playlist_items(
        &self,
        id: &str,
        uris: &[String],
        position: Option<u32>,
    ) -> Result<(), ApiError> {
        self.record("add_playlist_items")?;
        let mut contents = self.playlist_contents.lock().unwrap();
        let list = contents.entry(bare_id(id).to_string()).or_default();
        let at = position.map(|p| p as usize).unwrap_or(list.len()).min(list.len());
        let tail = list.split_off(at);
        list.extend(uris.iter().cloned());
        list.extend(tail);
        Ok(())
    }

    async fn remove_playlist_items(&self, id: &str, uris: &[String]) -> Result<(), ApiError> {
        self.record("remove_playlist_items")?;
        let mut contents = self.playlist_contents.lock().unwrap();
        if let Some(list) = contents.get_mut(bare_id(id)) {
            list.retain(|uri| !uris.contains(uri));
        }
        Ok(())
    }

    async fn follow_artists(&self, _ids: &[String]) -> Result<(), ApiError> {
        self.record("follow_artists")
    }

    async fn unfollow_artists(&self, _ids: &[String]) -> Result<(), ApiError> {
        self.record("unfollow_artists")
    }

    async fn save_albums(&self, _ids: &[String]) -> Result<(), ApiError> {
        self.record("save_albums")
    }

    async fn remove_saved_albums(&self, _ids: &[String]) -> Result<(), ApiError> {
        self.record("remove_saved_albums")
    }

    async fn save_tracks(&self, ids: &[String]) -> Result<(), ApiError> {
        self.record("save_tracks")?;
        self.saved_tracks.lock().unwrap().extend(ids.iter().cloned());
        Ok(())
    }

    async fn remove_saved_tracks(&self, ids: &[String]) -> Result<(), ApiError> {
        self.record("remove_saved_tracks")?;
        self.saved_tracks.lock().unwrap().retain(|t| !ids.contains(t));
        Ok(())
    }

    async fn follow_playlist(&self, _id: &str) -> Result<(), ApiError> {
        self.record("follow_playlist")
    }

    async fn unfollow_playlist(&self, _id: &str) -> Result<(), ApiError> {
        self.record("unfollow_playlist")
    }

    async fn saved_tracks_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError> {
        self.record("saved_tracks_contains")?;
        let saved: Vec<String> = self
            .saved_tracks
            .lock()
            .unwrap()
            .iter()
            .map(|t| bare_id(t).to_string())
            .collect();
        Ok(ids.iter().map(|id| saved.iter().any(|s| s == bare_id(id))).collect())
    }

    async fn saved_albums_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError> {
        self.record("saved_albums_contains")?;
        Ok(vec![false; ids.len()])
    }

    async fn following_artists_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError> {
        self.record("following_artists_contains")?;
        Ok(vec![false; ids.len()])
    }

    async fn queue(&self) -> Result<Queue, ApiError> {
        self.record("queue")?;
        Ok(Queue {
            currently_playing: None,
            queue: vec![track("q1", "Queued", "Someone")],
        })
    }

    async fn recently_played(&self, _limit: u32) -> Result<CursorPage<PlayHistory>, ApiError> {
        self.record("recently_played")?;
        Ok(CursorPage {
            items: vec![PlayHistory {
                track: track("r1", "Recent", "Someone"),
                played_at: "2024-05-01T10:00:00Z".to_string(),
            }],
            ..Default::default()
        })
    }

    async fn start_playback(&self, request: &PlaybackRequest) -> Result<(), ApiError> {
        self.record("start_playback")?;
        self.playback_requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn pause_playback(&self) -> Result<(), ApiError> {
        self.record("pause_playback")
    }

    async fn next_track(&self) -> Result<(), ApiError> {
        self.record("next_track")
    }

    async fn previous_track(&self) -> Result<(), ApiError> {
        self.record("previous_track")
    }

    async fn seek(&self, _position_ms: u64) -> Result<(), ApiError> {
        self.record("seek")
    }

    async fn set_volume(&self, _percent: u8) -> Result<(), ApiError> {
        self.record("set_volume")
    }

    async fn set_shuffle(&self, _state: bool) -> Result<(), ApiError> {
        self.record("set_shuffle")
    }

    async fn set_repeat(&self, state: RepeatState) -> Result<(), ApiError> {
        self.record(format!("set_repeat:{}", state.as_str()))
    }

    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<(), ApiError> {
        self.record(format!("transfer_playback:{}:{}", device_id, play))
    }
}
