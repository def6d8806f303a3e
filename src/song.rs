//! Song detail panel and the follow/unfollow library commands.

use std::{fmt, str::FromStr, time::Duration};

use serde::Serialize;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::{
    error::{ApiError, FeatureError},
    session::Session,
    spotify::bare_id,
    state::{Feature, NowPlaying, Snapshot},
    types::{Artist, AudioFeatures, CurrentPlayback, Image, Playlist, Track},
    utils::{first_image_url, format_duration},
};

const PLAYBACK_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowKind {
    Artist,
    Album,
    Track,
    Playlist,
}

impl fmt::Display for FollowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FollowKind::Artist => "artist",
            FollowKind::Album => "album",
            FollowKind::Track => "track",
            FollowKind::Playlist => "playlist",
        };
        f.write_str(name)
    }
}

impl FromStr for FollowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "artist" => Ok(FollowKind::Artist),
            "album" => Ok(FollowKind::Album),
            "track" => Ok(FollowKind::Track),
            "playlist" => Ok(FollowKind::Playlist),
            other => Err(format!("unknown follow target: {}", other)),
        }
    }
}

/// Explicit id, or `None` to act on what is currently playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowRequest {
    pub kind: FollowKind,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumTrack {
    pub track_number: u32,
    pub name: String,
    pub artist: String,
    pub uri: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextPlaylist {
    pub name: String,
    pub images: Vec<Image>,
    pub description: String,
}

impl From<Playlist> for ContextPlaylist {
    fn from(playlist: Playlist) -> Self {
        Self {
            name: playlist.name,
            images: playlist.images,
            description: playlist.description,
        }
    }
}

/// Reads the currently playing item, retrying once after a short pause.
async fn read_currently_playing(session: &Session) -> Result<Option<CurrentPlayback>, ApiError> {
    let mut attempt = 1;
    loop {
        match session.client().currently_playing(None).await {
            Ok(playback) => return Ok(playback),
            Err(e) if attempt < PLAYBACK_ATTEMPTS => {
                error!(error = %e, attempt, "currently playing unavailable, retrying");
                attempt += 1;
                sleep(RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn first_flag(flags: Result<Vec<bool>, ApiError>) -> Result<bool, ApiError> {
    Ok(flags?.first().copied().unwrap_or(false))
}

fn percent(features: Option<&AudioFeatures>, pick: fn(&AudioFeatures) -> f64) -> Value {
    json!(features.map(|f| (pick(f) * 100.0).round() as i64))
}

fn context_playlist_id(uri: &str) -> &str {
    uri.strip_prefix("spotify:playlist:").unwrap_or(uri)
}

/// Builds the song panel. Returns the snapshot together with the now-playing
/// ids, which are `None` when nothing is playing.
pub async fn song_data(session: &Session) -> Result<(Snapshot, Option<NowPlaying>), FeatureError> {
    let playback = read_currently_playing(session).await?;
    let Some((playback, item)) = playback.and_then(|p| p.item.clone().map(|item| (p, item))) else {
        debug!("nothing playing");
        return Ok((Snapshot::idle(Feature::SongData), None));
    };

    let client = session.client();
    let artist = item.artists.first().cloned().unwrap_or_default();
    let album = item.album.clone();
    let isrc = item
        .external_ids
        .isrc
        .clone()
        .unwrap_or_default()
        .to_uppercase();

    let artist_ids = vec![artist.id.clone()];
    let album_ids = vec![album.id.clone()];
    let track_uris = vec![item.uri.clone()];
    let (follow_artist, follow_album, follow_track, details) = tokio::join!(
        client.following_artists_contains(&artist_ids),
        client.saved_albums_contains(&album_ids),
        client.saved_tracks_contains(&track_uris),
        client.track(&item.uri),
    );
    let follow_artist = first_flag(follow_artist)?;
    let follow_album = first_flag(follow_album)?;
    let follow_track = first_flag(follow_track)?;
    let details: Track = details?;

    let context = playback.context.as_ref().filter(|c| !c.uri.is_empty());
    let mut play_source = "queue".to_string();
    let mut context_uri = None;
    let mut playlist_follow = None;
    let mut context_playlist = None;
    if let Some(context) = context {
        play_source = if context.kind.is_empty() {
            "unknown".to_string()
        } else {
            context.kind.clone()
        };
        if context.kind == "playlist" {
            let id = context_playlist_id(&context.uri);
            let (following, playlist) = tokio::try_join!(
                client.playlist_is_following(id, session.user_id()),
                client.playlist(id),
            )?;
            playlist_follow = Some(following);
            context_playlist = Some(ContextPlaylist::from(playlist));
            context_uri = Some(context.uri.clone());
        }
    }

    let lyrics_link = match session.lyrics() {
        Some(lyrics) if !isrc.is_empty() => match lyrics.track_share_url(&isrc).await {
            Ok(link) => link,
            Err(e) => {
                warn!(error = %e, "lyrics lookup failed");
                None
            }
        },
        _ => None,
    };

    let features_ids = vec![item.id.clone()];
    let (features, artist_details, album_tracks) = tokio::try_join!(
        client.audio_features(&features_ids),
        async {
            if artist.id.is_empty() {
                Ok(Artist::default())
            } else {
                client.artist(&artist.id).await
            }
        },
        async {
            if album.id.is_empty() {
                Ok(Vec::new())
            } else {
                client.album_tracks(&album.id).await.map(|p| p.items)
            }
        },
    )?;
    let features = features.into_iter().next().flatten();
    let features = features.as_ref();

    let album_tracks: Vec<AlbumTrack> = album_tracks
        .iter()
        .map(|t| AlbumTrack {
            track_number: t.track_number,
            name: t.name.clone(),
            artist: t.artists.first().map(|a| a.name.clone()).unwrap_or_default(),
            uri: t.uri.clone(),
        })
        .collect();

    let spotify = json!({
        "spotify_track_id": item.id,
        "spotify_track_uri": item.uri,
        "spotify_artist_name": artist.name,
        "spotify_artist_id": artist.id,
        "spotify_artist_uri": artist.uri,
        "spotify_album_id": album.id,
        "spotify_album_uri": album.uri,
        "spotify_album_img": album.images,
        "spotify_track_name": item.name,
        "spotify_track_length": format_duration(item.duration_ms),
        "spotify_album_name": album.name,
        "spotify_track_isrc": isrc,
        "spotify_artist_img": first_image_url(&artist_details.images),
        "spotify_album_tracks": album_tracks,
        "spotify_danceability": percent(features, |f| f.danceability),
        "spotify_energy": percent(features, |f| f.energy),
        "spotify_valence": percent(features, |f| f.valence),
        "spotify_popularity": item.popularity,
        "spotify_loudness": features.map(|f| f.loudness),
        "spotify_liveness": percent(features, |f| f.liveness),
        "spotify_instrumentalness": percent(features, |f| f.instrumentalness),
        "spotify_speechiness": percent(features, |f| f.speechiness),
        "spotify_tempo": features.map(|f| f.tempo),
        "spotify_time_signature": features.map(|f| f.time_signature),
        "spotify_acousticness": percent(features, |f| f.acousticness),
        "spotify_follow_artist": follow_artist,
        "spotify_follow_album": follow_album,
        "spotify_follow_track": follow_track,
        "lyrics_link": lyrics_link,
        "spotify_playlist_follow": playlist_follow,
        "spotify_playlist": context_playlist,
        "spotify_context_URI": context_uri,
        "spotify_copyright": details.album.copyrights,
        "spotify_play_source": play_source,
        "spotify_genres": details.album.genres,
        "spotify_track_release_date": details.album.release_date,
        "spotify_track_label": details.album.label,
    });

    let now_playing = NowPlaying {
        track_id: Some(item.id.clone()).filter(|s| !s.is_empty()),
        track_uri: Some(item.uri.clone()).filter(|s| !s.is_empty()),
        artist_id: Some(artist.id.clone()).filter(|s| !s.is_empty()),
        album_id: Some(album.id.clone()).filter(|s| !s.is_empty()),
        context_uri: playback
            .context
            .as_ref()
            .map(|c| c.uri.clone())
            .filter(|s| !s.is_empty()),
    };

    debug!(track = %item.name, "song data collected");
    Ok((
        Snapshot::new(Feature::SongData, item.name.clone(), json!({ "spotify": spotify })),
        Some(now_playing),
    ))
}

/// Resolves the target id: the explicit one, else the matching now-playing
/// field.
pub fn follow_target(request: &FollowRequest, now_playing: Option<&NowPlaying>) -> Option<String> {
    if let Some(id) = request.id.as_deref().filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }

    let now = now_playing?;
    match request.kind {
        FollowKind::Artist => now.artist_id.clone(),
        FollowKind::Album => now.album_id.clone(),
        FollowKind::Track => now.track_uri.clone().or_else(|| now.track_id.clone()),
        FollowKind::Playlist => now
            .context_uri
            .as_deref()
            .filter(|uri| uri.starts_with("spotify:playlist:"))
            .map(str::to_string),
    }
}

/// Adds (`follow == true`) or removes the target from the user's library.
/// Without an explicit id and without anything playing this is a no-op.
pub async fn set_following(
    session: &Session,
    request: &FollowRequest,
    now_playing: Option<&NowPlaying>,
    follow: bool,
) -> Result<(), FeatureError> {
    let Some(target) = follow_target(request, now_playing) else {
        debug!(kind = %request.kind, "no follow target");
        return Ok(());
    };

    let client = session.client();
    let ids = vec![target.clone()];
    match (request.kind, follow) {
        (FollowKind::Artist, true) => client.follow_artists(&ids).await?,
        (FollowKind::Artist, false) => client.unfollow_artists(&ids).await?,
        (FollowKind::Album, true) => client.save_albums(&ids).await?,
        (FollowKind::Album, false) => client.remove_saved_albums(&ids).await?,
        (FollowKind::Track, true) => client.save_tracks(&ids).await?,
        (FollowKind::Track, false) => client.remove_saved_tracks(&ids).await?,
        (FollowKind::Playlist, true) => client.follow_playlist(bare_id(&target)).await?,
        (FollowKind::Playlist, false) => client.unfollow_playlist(bare_id(&target)).await?,
    }

    debug!(kind = %request.kind, id = %target, follow, "library updated");
    Ok(())
}
