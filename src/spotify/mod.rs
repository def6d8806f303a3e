//! # Spotify Integration Module
//!
//! The remote seam of spotplus. Every feature handler talks to the Web API
//! exclusively through the [`SpotifyApi`] trait, which keeps the handlers
//! testable against an in-memory fake and leaves transport concerns in one
//! place.
//!
//! ```text
//! Feature handlers (recommend, search, artists, ...)
//!          ↓
//! SpotifyApi trait
//!          ↓
//! SpotifyClient (reqwest, bearer auth, 502 retry)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Submodules
//!
//! - [`auth`] - OAuth 2.0 PKCE flow, code exchange and token refresh
//! - [`client`] - the reqwest backed [`SpotifyClient`]
//! - [`lyrics`] - optional Musixmatch lookup keyed by ISRC
//!
//! ## Error Handling
//!
//! Every method returns `Result<_, ApiError>`. Transport failures become
//! [`ApiError::Transient`], the `NO_ACTIVE_DEVICE` reason becomes
//! [`ApiError::NoDevice`], anything else the API reports becomes
//! [`ApiError::Remote`] carrying the remote reason string.
//!
//! [`ApiError::Transient`]: crate::error::ApiError::Transient
//! [`ApiError::NoDevice`]: crate::error::ApiError::NoDevice
//! [`ApiError::Remote`]: crate::error::ApiError::Remote

pub mod auth;
pub mod client;
mod endpoints;
pub mod lyrics;

use async_trait::async_trait;

use crate::{
    error::ApiError,
    types::{
        Album, Artist, AudioFeatures, Category, CurrentPlayback, CursorPage, Device, Page,
        PlayHistory, PlaybackRequest, Playlist, PlaylistDetails, PlaylistItem, Queue,
        Recommendations, SavedAlbum, SavedTrack, SearchKind, SearchResponse, Track, UserProfile,
    },
};

pub use client::SpotifyClient;
pub use lyrics::{LyricsLookup, MusixmatchClient};

/// Largest page the library endpoints hand out in one request.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Maximum number of ids or uris accepted by bulk endpoints.
pub const MAX_BATCH: usize = 50;

/// Maximum number of items one playlist mutation accepts.
pub const MAX_PLAYLIST_BATCH: usize = 100;

/// Time window used by the personalisation endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    #[default]
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short_term" | "short" => Ok(TimeRange::ShortTerm),
            "medium_term" | "medium" => Ok(TimeRange::MediumTerm),
            "long_term" | "long" => Ok(TimeRange::LongTerm),
            other => Err(format!("unknown time range: {}", other)),
        }
    }
}

/// Repeat state as the Web API names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatState {
    Off,
    Context,
    Track,
}

impl RepeatState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatState::Off => "off",
            RepeatState::Context => "context",
            RepeatState::Track => "track",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(RepeatState::Off),
            "context" => Some(RepeatState::Context),
            "track" => Some(RepeatState::Track),
            _ => None,
        }
    }
}

/// Query parameters of a recommendation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationQuery {
    pub limit: u32,
    pub market: Option<String>,
    pub seed_artists: Vec<String>,
    pub seed_genres: Vec<String>,
    pub seed_tracks: Vec<String>,
    /// Tunable attribute bounds as `(min_x|max_x, value)` pairs.
    pub bounds: Vec<(String, f64)>,
}

impl RecommendationQuery {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![("limit".to_string(), self.limit.to_string())];
        if let Some(market) = &self.market {
            query.push(("market".to_string(), market.clone()));
        }
        for (key, seeds) in [
            ("seed_artists", &self.seed_artists),
            ("seed_genres", &self.seed_genres),
            ("seed_tracks", &self.seed_tracks),
        ] {
            if !seeds.is_empty() {
                query.push((key.to_string(), seeds.join(",")));
            }
        }
        for (key, value) in &self.bounds {
            query.push((key.clone(), value.to_string()));
        }
        query
    }
}

/// All remote operations the features need.
///
/// Implemented by [`SpotifyClient`] for the real service. Ids may be passed
/// either bare or as `spotify:` URIs wherever the API accepts both.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// Replaces the bearer token after a refresh.
    fn set_access_token(&self, _token: &str) {}

    async fn me(&self) -> Result<UserProfile, ApiError>;
    async fn devices(&self) -> Result<Vec<Device>, ApiError>;
    async fn current_playback(&self) -> Result<Option<CurrentPlayback>, ApiError>;
    async fn currently_playing(
        &self,
        market: Option<&str>,
    ) -> Result<Option<CurrentPlayback>, ApiError>;

    async fn top_artists(
        &self,
        limit: u32,
        offset: u32,
        time_range: TimeRange,
    ) -> Result<Page<Artist>, ApiError>;
    async fn top_tracks(
        &self,
        limit: u32,
        offset: u32,
        time_range: TimeRange,
    ) -> Result<Page<Track>, ApiError>;
    async fn followed_artists(
        &self,
        limit: u32,
        after: Option<String>,
    ) -> Result<CursorPage<Artist>, ApiError>;
    async fn saved_tracks(&self, limit: u32, offset: u32) -> Result<Page<SavedTrack>, ApiError>;
    async fn saved_albums(&self, limit: u32, offset: u32) -> Result<Page<SavedAlbum>, ApiError>;

    async fn artist(&self, id: &str) -> Result<Artist, ApiError>;
    async fn artists(&self, ids: &[String]) -> Result<Vec<Artist>, ApiError>;
    async fn track(&self, id: &str) -> Result<Track, ApiError>;
    async fn tracks(&self, ids: &[String]) -> Result<Vec<Track>, ApiError>;
    async fn artist_albums(
        &self,
        id: &str,
        market: Option<&str>,
        limit: u32,
    ) -> Result<Page<Album>, ApiError>;
    async fn artist_related_artists(&self, id: &str) -> Result<Vec<Artist>, ApiError>;
    async fn artist_top_tracks(&self, id: &str, market: Option<&str>)
    -> Result<Vec<Track>, ApiError>;
    async fn album_tracks(&self, id: &str) -> Result<Page<Track>, ApiError>;
    async fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, ApiError>;
    async fn recommendations(&self, query: &RecommendationQuery)
    -> Result<Recommendations, ApiError>;
    async fn genre_seeds(&self) -> Result<Vec<String>, ApiError>;
    async fn search(
        &self,
        query: &str,
        kinds: &[SearchKind],
        limit: u32,
        market: Option<&str>,
    ) -> Result<SearchResponse, ApiError>;
    async fn categories(
        &self,
        market: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Category>, ApiError>;
    async fn category_playlists(
        &self,
        category_id: &str,
        market: Option<&str>,
        limit: u32,
    ) -> Result<Page<Playlist>, ApiError>;

    async fn current_user_playlists(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Page<Playlist>, ApiError>;
    async fn playlist(&self, id: &str) -> Result<Playlist, ApiError>;
    async fn playlist_items(
        &self,
        id: &str,
        limit: u32,
        offset: u32,
        market: Option<&str>,
    ) -> Result<Page<PlaylistItem>, ApiError>;
    async fn playlist_is_following(&self, id: &str, user_id: &str) -> Result<bool, ApiError>;
    async fn create_playlist(
        &self,
        user_id: &str,
        details: &PlaylistDetails,
    ) -> Result<Playlist, ApiError>;
    async fn change_playlist_details(
        &self,
        id: &str,
        details: &PlaylistDetails,
    ) -> Result<(), ApiError>;
    async fn add_playlist_items(
        &self,
        id: &str,
        uris: &[String],
        position: Option<u32>,
    ) -> Result<(), ApiError>;
    async fn remove_playlist_items(&self, id: &str, uris: &[String]) -> Result<(), ApiError>;

    async fn follow_artists(&self, ids: &[String]) -> Result<(), ApiError>;
    async fn unfollow_artists(&self, ids: &[String]) -> Result<(), ApiError>;
    async fn save_albums(&self, ids: &[String]) -> Result<(), ApiError>;
    async fn remove_saved_albums(&self, ids: &[String]) -> Result<(), ApiError>;
    async fn save_tracks(&self, ids: &[String]) -> Result<(), ApiError>;
    async fn remove_saved_tracks(&self, ids: &[String]) -> Result<(), ApiError>;
    async fn follow_playlist(&self, id: &str) -> Result<(), ApiError>;
    async fn unfollow_playlist(&self, id: &str) -> Result<(), ApiError>;
    async fn saved_tracks_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError>;
    async fn saved_albums_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError>;
    async fn following_artists_contains(&self, ids: &[String]) -> Result<Vec<bool>, ApiError>;

    async fn queue(&self) -> Result<Queue, ApiError>;
    async fn recently_played(&self, limit: u32) -> Result<CursorPage<PlayHistory>, ApiError>;

    async fn start_playback(&self, request: &PlaybackRequest) -> Result<(), ApiError>;
    async fn pause_playback(&self) -> Result<(), ApiError>;
    async fn next_track(&self) -> Result<(), ApiError>;
    async fn previous_track(&self) -> Result<(), ApiError>;
    async fn seek(&self, position_ms: u64) -> Result<(), ApiError>;
    async fn set_volume(&self, percent: u8) -> Result<(), ApiError>;
    async fn set_shuffle(&self, state: bool) -> Result<(), ApiError>;
    async fn set_repeat(&self, state: RepeatState) -> Result<(), ApiError>;
    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<(), ApiError>;
}

/// Strips a `spotify:<kind>:` prefix, leaving bare ids untouched.
pub fn bare_id(id_or_uri: &str) -> &str {
    id_or_uri.rsplit(':').next().unwrap_or(id_or_uri)
}
