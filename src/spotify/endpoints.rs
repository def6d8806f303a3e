use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use super::{
    MAX_BATCH, MAX_PLAYLIST_BATCH, RecommendationQuery, RepeatState, SpotifyApi, SpotifyClient,
    TimeRange, bare_id,
};
use crate::{
    error::ApiError,
    types::{
        AddItemsRequest, Album, Artist, ArtistsResponse, AudioFeatures, AudioFeaturesResponse,
        CategoriesResponse, Category, CurrentPlayback, CursorPage, Device, DevicesResponse,
        FollowedArtistsResponse, GenreSeedsResponse, Page, PlayHistory, PlaybackRequest, Playlist,
        PlaylistDetails, PlaylistItem, PlaylistsResponse, Queue, Recommendations,
        RemoveItemsRequest, SavedAlbum, SavedTrack, SearchKind, SearchResponse,
        SnapshotIdResponse, Track, TracksResponse, UriRef, UserProfile,
    },
};

/// `/me/albums/contains` accepts fewer ids than the other bulk endpoints.
const ALBUM_CONTAINS_BATCH: usize = 20;
const AUDIO_FEATURES_BATCH: usize = 100;

type Query<'a> = Vec<(&'a str, String)>;

const NO_QUERY: &[(&str, &str)] = &[];

fn ids_param(ids: &[String]) -> String {
    ids.iter()
        .map(|id| bare_id(id))
        .collect::<Vec<_>>()
        .join(",")
}

fn with_market<'a>(mut query: Query<'a>, market: Option<&str>) -> Query<'a> {
    if let Some(market) = market.filter(|m| !m.is_empty()) {
        query.push(("market", market.to_string()));
    }
    query
}

impl SpotifyClient {
    async fn contains(
        &self,
        path: &str,
        extra: Query<'_>,
        ids: &[String],
        batch: usize,
    ) -> Result<Vec<bool>, ApiError> {
        let mut flags = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(batch) {
            let mut query = extra.clone();
            query.push(("ids", ids_param(chunk)));
            let page: Vec<bool> = self.get(path, &query).await?;
            flags.extend(page);
        }
        Ok(flags)
    }

    async fn bulk_ids(
        &self,
        method: Method,
        path: &str,
        ids: &[String],
        batch: usize,
    ) -> Result<(), ApiError> {
        for chunk in ids.chunks(batch) {
            let query = vec![("ids", ids_param(chunk))];
            self.execute(method.clone(), path, &query, None::<&()>)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    fn set_access_token(&self, token: &str) {
        self.replace_token(token);
    }

    async fn me(&self) -> Result<UserProfile, ApiError> {
        self.get("/me", NO_QUERY).await
    }

    async fn devices(&self) -> Result<Vec<Device>, ApiError> {
        let res: DevicesResponse = self.get("/me/player/devices", NO_QUERY).await?;
        Ok(res.devices)
    }

    async fn current_playback(&self) -> Result<Option<CurrentPlayback>, ApiError> {
        let query = vec![("additional_types", "episode".to_string())];
        self.get_optional("/me/player", &query).await
    }

    async fn currently_playing(
        &self,
        market: Option<&str>,
    ) -> Result<Option<CurrentPlayback>, ApiError> {
        let query = with_market(vec![("additional_types", "episode".to_string())], market);
        self.get_optional("/me/player/currently-playing", &query)
            .await
    }

    async fn top_artists(
        &self,
        limit: u32,
        offset: u32,
        time_range: TimeRange,
    ) -> Result<Page<Artist>, ApiError> {
        let query = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("time_range", time_range.as_str().to_string()),
        ];
        self.get("/me/top/artists", &query).await
    }

    async fn top_tracks(
        &self,
        limit: u32,
        offset: u32,
        time_range: TimeRange,
    ) -> Result<Page<Track>, ApiError> {
        let query = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("time_range", time_range.as_str().to_string()),
        ];
        self.get("/me/top/tracks", &query).await
    }

    async fn followed_artists(
        &self,
        limit: u32,
        after: Option<String>,
    ) -> Result<CursorPage<Artist>, ApiError> {
        let mut query = vec![("type", "artist".to_string()), ("limit", limit.to_string())];
        if let Some(after) = after {
            query.push(("after", after));
        }
        let res: FollowedArtistsResponse = self.get("/me/following", &query).await?;
        Ok(res.artists)
    }

    async fn saved_tracks(&self, limit: u32, offset: u32) -> Result<Page<SavedTrack>, ApiError> {
        let query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        self.get("/me/tracks", &query).await
    }

    async fn saved_albums(&self, limit: u32, offset: u32) -> Result<Page<SavedAlbum>, ApiError> {
        let query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        self.get("/me/albums", &query).await
    }

    async fn artist(&self, id: &str) -> Result<Artist, ApiError> {
        self.get(&format!("/artists/{}", bare_id(id)), NO_QUERY)
            .await
    }

    async fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError> {
        let mut artists = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH) {
            let query = vec![("ids", ids_param(chunk))];
            let res: ArtistsResponse = self.get("/artists", &query).await?;
            artists.extend(res.artists);
        }
        Ok(artists)
    }

    async fn track(&self, id: &str) -> Result<Track, ApiError> {
        self.get(&format!("/tracks/{}", bare_id(id)), NO_QUERY).await
    }

    async fn tracks(&self, ids: &[String]) -> Result<Vec<Track>, ApiError> {
        let mut tracks = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BATCH) {
            let query = vec![("ids", ids_param(chunk))];
            let res: TracksResponse = self.get("/tracks", &query).await?;
            tracks.extend(res.tracks);
        }
        Ok(tracks)
    }

    async fn artist_albums(
        &self,
        id: &str,
        market: Option<&str>,
        limit: u32,
    ) -> Result<Page<Album>, ApiError> {
        let query = with_market(vec![("limit", limit.to_string())], market);
        self.get(&format!("/artists/{}/albums", bare_id(id)), &query)
            .await
    }

    async fn artist_related_artists(&self, id: &str) -> Result<Vec<Artist>, ApiError> {
        let res: ArtistsResponse = self
            .get(
                &format!("/artists/{}/related-artists", bare_id(id)),
                NO_QUERY,
            )
            .await?;
        Ok(res.artists)
    }

    async fn artist_top_tracks(
        &self,
        id: &str,
        market: Option<&str>,
    ) -> Result<Vec<Track>, ApiError> {
        let query = vec![(
            "market",
            market
                .filter(|m| !m.is_empty())
                .unwrap_or("from_token")
                .to_string(),
        )];
        let res: TracksResponse = self
            .get(&format!("/artists/{}/top-tracks", bare_id(id)), &query)
            .await?;
        Ok(res.tracks)
    }

    async fn album_tracks(&self, id: &str) -> Result<Page<Track>, ApiError> {
        let query = vec![("limit", MAX_BATCH.to_string())];
        self.get(&format!("/albums/{}/tracks", bare_id(id)), &query)
            .await
    }

    async fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, ApiError> {
        let mut features = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(AUDIO_FEATURES_BATCH) {
            let query = vec![("ids", ids_param(chunk))];
            let res: AudioFeaturesResponse = self.get("/audio-features", &query).await?;
            features.extend(res.audio_features);
        }
        Ok(features)
    }

    async fn recommendations(
        &self,
        query: &RecommendationQuery,
    ) -> Result<Recommendations, ApiError> {
        self.get("/recommendations", &query.to_query()).await
    }

    async fn genre_seeds(&self) -> Result<Vec<String>, ApiError> {
        let res: GenreSeedsResponse = self
            .get("/recommendations/available-genre-seeds", NO_QUERY)
            .await?;
        Ok(res.genres)
    }

    async fn search(
        &self,
        query: &str,
        kinds: &[SearchKind],
        limit: u32,
        market: Option<&str>,
    ) -> Result<SearchResponse, ApiError> {
        let kinds = kinds
            .iter()
            .map(SearchKind::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let params = with_market(
            vec![
                ("q", query.to_string()),
                ("type", kinds),
                ("limit", limit.to_string()),
            ],
            market,
        );
        self.get("/search", &params).await
    }

    async fn categories(
        &self,
        market: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Category>, ApiError> {
        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(country) = market.filter(|m| !m.is_empty()) {
            query.push(("country", country.to_string()));
        }
        let res: CategoriesResponse = self.get("/browse/categories", &query).await?;
        Ok(res.categories)
    }

    async fn category_playlists(
        &self,
        category_id: &str,
        market: Option<&str>,
        limit: u32,
    ) -> Result<Page<Playlist>, ApiError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(country) = market.filter(|m| !m.is_empty()) {
            query.push(("country", country.to_string()));
        }
        let res: PlaylistsResponse = self
            .get(
                &format!("/browse/categories/{}/playlists", category_id),
                &query,
            )
            .await?;
        Ok(res.playlists)
    }

    async fn current_user_playlists(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Playlist>, ApiError> {
        let query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        self.get("/me/playlists", &query).await
    }

    async fn playlist(&self, id: &str) -> Result<Playlist, ApiError> {
        self.get(&format!("/playlists/{}", bare_id(id)), NO_QUERY)
            .await
    }

    async fn playlist_items(
        &self,
        id: &str,
        limit: u32,
        offset: u32,
        market: Option<&str>,
    ) -> Result<Page<PlaylistItem>, ApiError> {
        let query = with_market(
            vec![
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("additional_types", "track,episode".to_string()),
            ],
            market,
        );
        self.get(&format!("/playlists/{}/tracks", bare_id(id)), &query)
            .await
    }

    async fn playlist_is_following(&self, id: &str, user_id: &str) -> Result<bool, ApiError> {
        let query = vec![("ids", user_id.to_string())];
        let flags: Vec<bool> = self
            .get(
                &format!("/playlists/{}/followers/contains", bare_id(id)),
                &query,
            )
            .await?;
        Ok(flags.first().copied().unwrap_or(false))
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        details: &PlaylistDetails,
    ) -> Result<Playlist, ApiError> {
        self.post(&format!("/users/{}/playlists", user_id), NO_QUERY, details)
            .await
    }

    async fn change_playlist_details(
        &self,
        id: &str,
        details: &PlaylistDetails,
    ) -> Result<(), ApiError> {
        self.execute(
            Method::PUT,
            &format!("/playlists/{}", bare_id(id)),
            NO_QUERY,
            Some(details),
        )
        .await
    }

    async fn add_playlist_items(
        &self,
        id: &str,
        uris: &[String],
        position: Option<u32>,
    ) -> Result<(), ApiError> {
        let path = format!("/playlists/{}/tracks", bare_id(id));
        for (index, chunk) in uris.chunks(MAX_PLAYLIST_BATCH).enumerate() {
            let body = AddItemsRequest {
                uris: chunk.to_vec(),
                position: position.map(|p| p + (index * MAX_PLAYLIST_BATCH) as u32),
            };
            let _: SnapshotIdResponse = self.post(&path, NO_QUERY, &body).await?;
        }
        Ok(())
    }

    async fn remove_playlist_items(&self, id: &str, uris: &[String]) -> Result<(), ApiError> {
        let path = format!("/playlists/{}/tracks", bare_id(id));
        for chunk in uris.chunks(MAX_PLAYLIST_BATCH) {
            let body = RemoveItemsRequest {
                tracks: chunk.iter().map(|uri| UriRef { uri: uri.clone() }).collect(),
            };
            self.execute(Method::DELETE, &path, NO_QUERY, Some(&body))
                .await?;
        }
        Ok(())
    }

    async fn follow_artists(&self, ids: &[String]) -> Result<(), ApiError> {
        for chunk in ids.chunks(MAX_BATCH) {
            let query = vec![("type", "artist".to_string()), ("ids", ids_param(chunk))];
            self.execute(Method::PUT, "/me/following", &query, None::<&()>)
                .await?;
        }
        Ok(())
    }

    async fn unfollow_artists(&self, ids: &[String]) -> Result<(), ApiError> {
        for chunk in ids.chunks(MAX_BATCH) {
            let query = vec![("type", "artist".to_string()), ("ids", ids_param(chunk))];
            self.execute(Method::DELETE, "/me/following", &query, None::<&()>)
                .await?;
        }
        Ok(())
    }

    async fn save_albums(&self, ids: &[String]) -> Result<(), ApiError> {
        self.bulk_ids(Method::PUT, "/me/albums", ids, ALBUM_CONTAINS_BATCH)
            .await
    }

    async fn remove_saved_albums(&self, ids: &[String]) -> Result<(), ApiError> {
        self.bulk_ids(Method::DELETE, "/me/albums", ids, ALBUM_CONTAINS_BATCH)
            .await
    }

    async fn save_tracks(&self, ids: &[String]) -> Result<(), ApiError> {
        self.bulk_ids(Method::PUT, "/me/tracks", ids, MAX_BATCH)
            .await
    }

    async fn remove_saved_tracks(&self, ids: &[String]) -> Result<(), ApiError> {
        self.bulk_ids(Method::DELETE, "/me/tracks", ids, MAX_BATCH)
            .await
    }

    async fn follow_playlist(&self, id: &str) -> Result<(), ApiError> {
        let body = json!({ "public": true });
        self.execute(
            Method::PUT,
            &format!("/playlists/{}/followers", bare_id(id)),
            NO_QUERY,
            Some(&body),
        )
        .await
    }

    async fn unfollow_playlist(&self, id: &str) -> Result<(), ApiError> {
        self.execute(
            Method::DELETE,
            &format!("/playlists/{}/followers", bare_id(id)),
            NO_QUERY,
            None::<&()>,
        )
        .await
    }

    async fn saved_tracks_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError> {
        self.contains("/me/tracks/contains", Vec::new(), ids, MAX_BATCH)
            .await
    }

    async fn saved_albums_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError> {
        self.contains("/me/albums/contains", Vec::new(), ids, ALBUM_CONTAINS_BATCH)
            .await
    }

    async fn following_artists_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError> {
        self.contains(
            "/me/following/contains",
            vec![("type", "artist".to_string())],
            ids,
            MAX_BATCH,
        )
        .await
    }

    async fn queue(&self) -> Result<Queue, ApiError> {
        self.get("/me/player/queue", NO_QUERY).await
    }

    async fn recently_played(&self, limit: u32) -> Result<CursorPage<PlayHistory>, ApiError> {
        let query = vec![("limit", limit.to_string())];
        self.get("/me/player/recently-played", &query).await
    }

    async fn start_playback(&self, request: &PlaybackRequest) -> Result<(), ApiError> {
        let mut query: Query = Vec::new();
        if let Some(device_id) = &request.device_id {
            query.push(("device_id", device_id.clone()));
        }
        self.execute(Method::PUT, "/me/player/play", &query, Some(request))
            .await
    }

    async fn pause_playback(&self) -> Result<(), ApiError> {
        self.execute(Method::PUT, "/me/player/pause", NO_QUERY, None::<&()>)
            .await
    }

    async fn next_track(&self) -> Result<(), ApiError> {
        self.execute(Method::POST, "/me/player/next", NO_QUERY, None::<&()>)
            .await
    }

    async fn previous_track(&self) -> Result<(), ApiError> {
        self.execute(Method::POST, "/me/player/previous", NO_QUERY, None::<&()>)
            .await
    }

    async fn seek(&self, position_ms: u64) -> Result<(), ApiError> {
        let query = vec![("position_ms", position_ms.to_string())];
        self.execute(Method::PUT, "/me/player/seek", &query, None::<&()>)
            .await
    }

    async fn set_volume(&self, percent: u8) -> Result<(), ApiError> {
        let query = vec![("volume_percent", percent.min(100).to_string())];
        self.execute(Method::PUT, "/me/player/volume", &query, None::<&()>)
            .await
    }

    async fn set_shuffle(&self, state: bool) -> Result<(), ApiError> {
        let query = vec![("state", state.to_string())];
        self.execute(Method::PUT, "/me/player/shuffle", &query, None::<&()>)
            .await
    }

    async fn set_repeat(&self, state: RepeatState) -> Result<(), ApiError> {
        let query = vec![("state", state.as_str().to_string())];
        self.execute(Method::PUT, "/me/player/repeat", &query, None::<&()>)
            .await
    }

    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<(), ApiError> {
        let body = json!({ "device_ids": [device_id], "play": play });
        self.execute(Method::PUT, "/me/player", NO_QUERY, Some(&body))
            .await
    }
}
