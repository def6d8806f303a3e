use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{config, error::ApiError};

/// Resolves a lyrics page for a recording.
#[async_trait]
pub trait LyricsLookup: Send + Sync {
    /// Returns the share URL of the lyrics page for `isrc`, or `None` when the
    /// provider does not know the recording.
    async fn track_share_url(&self, isrc: &str) -> Result<Option<String>, ApiError>;
}

#[derive(Debug, Default, Deserialize)]
struct LyricsResponse {
    #[serde(default)]
    message: LyricsMessage,
}

#[derive(Debug, Default, Deserialize)]
struct LyricsMessage {
    // The provider answers with `"body": []` when nothing matches.
    #[serde(default)]
    body: serde_json::Value,
}

/// Musixmatch `track.get` lookup keyed by ISRC.
pub struct MusixmatchClient {
    http: Client,
    api_url: String,
    api_token: String,
}

impl MusixmatchClient {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self::with_url(config::DEFAULT_LYRICS_URL, api_token)
    }

    pub fn with_url(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into(),
            api_token: api_token.into(),
        }
    }
}

#[async_trait]
impl LyricsLookup for MusixmatchClient {
    async fn track_share_url(&self, isrc: &str) -> Result<Option<String>, ApiError> {
        if isrc.is_empty() {
            return Ok(None);
        }

        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("format", "json"),
                ("apikey", self.api_token.as_str()),
                ("track_isrc", isrc),
            ])
            .send()
            .await?
            .error_for_status()?;

        // Served as text/plain, so decode by hand.
        let text = response.text().await?;
        let parsed: LyricsResponse = serde_json::from_str(&text).unwrap_or_default();
        let url = parsed
            .message
            .body
            .pointer("/track/track_share_url")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        debug!(isrc, found = url.is_some(), "lyrics lookup");
        Ok(url)
    }
}
