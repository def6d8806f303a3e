//! Configuration management for spotplus.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory:
//! 1. Environment variables (highest priority)
//! 2. `<data_local_dir>/spotplus/.env`
//! 3. Built-in defaults for endpoints and account settings
//!
//! The OAuth application values (`client id`, `redirect uri`, `server address`)
//! have no sensible default and are only needed by the `auth` flow.

use dotenv;
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_LYRICS_URL: &str = "https://api.musixmatch.com/ws/1.1/track.get";

pub const DEFAULT_TOLERANCE_PERCENT: f64 = 20.0;
pub const DEFAULT_TRACK_COUNT: usize = 100;
pub const DEFAULT_PLAYLIST_DESCRIPTION: &str = "Created by Spotify+ Tools";
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_secs(150);
pub const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Scopes every feature relies on. A session whose token grants fewer is
/// rejected at setup.
pub const SPOTIFY_SCOPES: [&str; 15] = [
    "user-modify-playback-state",
    "user-read-playback-state",
    "user-read-private",
    "playlist-read-private",
    "playlist-read-collaborative",
    "user-library-read",
    "user-top-read",
    "user-read-playback-position",
    "user-read-recently-played",
    "user-follow-read",
    "user-follow-modify",
    "user-read-currently-playing",
    "playlist-modify-private",
    "playlist-modify-public",
    "user-library-modify",
];

/// Loads environment variables from `<data_local_dir>/spotplus/.env`.
///
/// Creates the directory when missing. A missing `.env` file is not an error
/// since every value may also come from the process environment.
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or the file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Root of everything spotplus stores locally.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotplus");
    path
}

/// Address the local OAuth callback server binds to.
///
/// # Panics
///
/// Panics if `SERVER_ADDRESS` is not set.
pub fn server_addr() -> String {
    env::var("SERVER_ADDRESS").expect("SERVER_ADDRESS must be set")
}

/// # Panics
///
/// Panics if `SPOTIFY_API_AUTH_CLIENT_ID` is not set.
pub fn spotify_client_id() -> String {
    env::var("SPOTIFY_API_AUTH_CLIENT_ID").expect("SPOTIFY_API_AUTH_CLIENT_ID must be set")
}

/// # Panics
///
/// Panics if `SPOTIFY_API_REDIRECT_URI` is not set.
pub fn spotify_redirect_uri() -> String {
    env::var("SPOTIFY_API_REDIRECT_URI").expect("SPOTIFY_API_REDIRECT_URI must be set")
}

pub fn spotify_scope() -> String {
    SPOTIFY_SCOPES.join(" ")
}

pub fn spotify_apiauth_url() -> String {
    env::var("SPOTIFY_API_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string())
}

pub fn spotify_apiurl() -> String {
    env::var("SPOTIFY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

pub fn spotify_apitoken_url() -> String {
    env::var("SPOTIFY_API_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string())
}

/// Account level options plus the tuning knobs of the playlist builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub lyrics_api_token: Option<String>,
    pub history_playlist_id: Option<String>,
    pub tolerance_percent: f64,
    pub track_count: usize,
    pub playlist_description: String,
    pub device_poll_interval: Duration,
    pub playback_poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lyrics_api_token: None,
            history_playlist_id: None,
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
            track_count: DEFAULT_TRACK_COUNT,
            playlist_description: DEFAULT_PLAYLIST_DESCRIPTION.to_string(),
            device_poll_interval: DEVICE_POLL_INTERVAL,
            playback_poll_interval: PLAYBACK_POLL_INTERVAL,
        }
    }
}

impl Settings {
    /// Reads the settings from the environment. Unset or unparsable values
    /// fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            lyrics_api_token: non_empty("MUSIXMATCH_API_TOKEN"),
            history_playlist_id: non_empty("SPOTIFY_HISTORY_PLAYLIST_ID"),
            tolerance_percent: non_empty("SPOTPLUS_TOLERANCE")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| (0.0..=100.0).contains(v))
                .unwrap_or(defaults.tolerance_percent),
            track_count: non_empty("SPOTPLUS_TRACK_COUNT")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.track_count),
            ..defaults
        }
    }
}
