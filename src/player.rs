//! # Playback mirror
//!
//! Polls the current playback on a short interval and mirrors it into the
//! `player` snapshot. Commands are single remote calls; the next poll picks up
//! their effect.
//!
//! Repeat modes are translated both ways:
//!
//! | Mirror | Web API |
//! |---|---|
//! | `off` | `off` |
//! | `all` | `context` |
//! | `one` | `track` |

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, warn};

use crate::{
    error::FeatureError,
    session::Session,
    spotify::RepeatState,
    state::{Feature, Snapshot, StateBoard},
    types::{CurrentPlayback, Device, PlaybackRequest},
    utils::{format_duration, strip_media_uri},
};

const MEDIA_TYPE_PREFIX: &str = "spotify://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn to_remote(self) -> RepeatState {
        match self {
            RepeatMode::Off => RepeatState::Off,
            RepeatMode::All => RepeatState::Context,
            RepeatMode::One => RepeatState::Track,
        }
    }

    pub fn from_remote(state: RepeatState) -> Self {
        match state {
            RepeatState::Off => RepeatMode::Off,
            RepeatState::Context => RepeatMode::All,
            RepeatState::Track => RepeatMode::One,
        }
    }
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(RepeatMode::Off),
            "all" => Ok(RepeatMode::All),
            "one" => Ok(RepeatMode::One),
            other => Err(format!("unsupported repeat mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
}

impl PlayerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Idle => "idle",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Next,
    Previous,
    /// Position in seconds.
    Seek(f64),
    /// Level in `0.0..=1.0`.
    Volume(f64),
    SelectSource(String),
    Shuffle(bool),
    Repeat(RepeatMode),
    PlayMedia { media_type: String, media_id: String },
}

/// Mirrored playback, serialized as the `player` snapshot attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackView {
    pub state: PlayerState,
    pub volume_level: Option<f64>,
    pub media_position: Option<f64>,
    pub media_position_updated_at: Option<DateTime<Utc>>,
    pub media_duration: Option<f64>,
    pub media_content_id: Option<String>,
    pub media_content_type: Option<String>,
    pub media_title: Option<String>,
    pub media_artist: Option<String>,
    pub media_album_name: Option<String>,
    pub media_track: Option<u32>,
    pub media_playlist: Option<String>,
    pub media_context_uri: Option<String>,
    pub source: Option<String>,
    pub source_list: Vec<String>,
    pub shuffle: Option<bool>,
    pub repeat: Option<RepeatMode>,
    pub media_artist_id: Option<String>,
    pub media_album_id: Option<String>,
    pub media_album_img: Option<String>,
    pub media_track_length: Option<String>,
    pub media_track_percent: Option<u32>,
    pub media_track_isrc: Option<String>,
    pub media_current_device_id: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

impl PlaybackView {
    pub fn from_playback(playback: Option<&CurrentPlayback>, devices: &[Device]) -> Self {
        let source_list = devices.iter().map(|d| d.name.clone()).collect();

        let Some(playback) = playback else {
            return Self::idle(source_list);
        };

        let state = if playback.is_playing {
            PlayerState::Playing
        } else {
            PlayerState::Paused
        };
        let device = playback.device.as_ref();
        let item = playback.item.as_ref();
        let episode = item.is_some_and(|i| i.kind == "episode");

        let duration_ms = item.map(|i| i.duration_ms).filter(|d| *d > 0);
        let percent = match (playback.progress_ms, duration_ms) {
            (Some(progress), Some(duration)) => Some((progress * 100 / duration) as u32),
            _ => None,
        };

        let media_artist = item.map(|i| match (&i.show, episode) {
            (Some(show), true) => show.publisher.clone(),
            _ => i
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        });
        let media_album_name = item.map(|i| match (&i.show, episode) {
            (Some(show), true) => show.name.clone(),
            _ => i.album.name.clone(),
        });

        Self {
            state,
            volume_level: device.map(|d| d.volume_percent.unwrap_or(0) as f64 / 100.0),
            media_position: playback.progress_ms.map(|p| p as f64 / 1000.0),
            media_position_updated_at: DateTime::from_timestamp_millis(playback.timestamp),
            media_duration: item.map(|i| i.duration_ms as f64 / 1000.0),
            media_content_id: item.and_then(|i| non_empty(&i.uri)),
            media_content_type: item.map(|_| {
                let kind = if episode { "podcast" } else { "music" };
                kind.to_string()
            }),
            media_title: item.map(|i| i.name.clone()),
            media_artist,
            media_album_name,
            media_track: item.map(|i| i.track_number).filter(|n| *n > 0),
            media_playlist: None,
            media_context_uri: playback.context.as_ref().and_then(|c| non_empty(&c.uri)),
            source: device.map(|d| d.name.clone()),
            source_list,
            shuffle: playback.shuffle_state,
            repeat: playback
                .repeat_state
                .as_deref()
                .and_then(RepeatState::parse)
                .map(RepeatMode::from_remote),
            media_artist_id: item.and_then(|i| i.artists.first()).and_then(|a| non_empty(&a.id)),
            media_album_id: item.and_then(|i| non_empty(&i.album.id)),
            media_album_img: item.and_then(|i| i.album.images.first()).map(|img| img.url.clone()),
            media_track_length: Some(format_duration(duration_ms.unwrap_or(0))),
            media_track_percent: percent,
            media_track_isrc: item.map(|i| {
                i.external_ids
                    .isrc
                    .clone()
                    .unwrap_or_default()
                    .to_uppercase()
            }),
            media_current_device_id: device.and_then(|d| d.id.clone()),
        }
    }

    fn idle(source_list: Vec<String>) -> Self {
        Self {
            state: PlayerState::Idle,
            volume_level: None,
            media_position: None,
            media_position_updated_at: None,
            media_duration: None,
            media_content_id: None,
            media_content_type: None,
            media_title: None,
            media_artist: None,
            media_album_name: None,
            media_track: None,
            media_playlist: None,
            media_context_uri: None,
            source: None,
            source_list,
            shuffle: None,
            repeat: None,
            media_artist_id: None,
            media_album_id: None,
            media_album_img: None,
            media_track_length: None,
            media_track_percent: None,
            media_track_isrc: None,
            media_current_device_id: None,
        }
    }

    pub fn with_playlist(mut self, name: Option<String>) -> Self {
        self.media_playlist = name;
        self
    }

    pub fn into_snapshot(self) -> Snapshot {
        let state = self.state.as_str();
        let attributes = serde_json::to_value(&self).unwrap_or(Value::Null);
        Snapshot::new(Feature::Player, state, attributes)
    }
}

fn attribute_str<'a>(snapshot: &'a Snapshot, key: &str) -> Option<&'a str> {
    snapshot.attribute(key).and_then(Value::as_str)
}

/// Reads the current playback into a `player` snapshot.
///
/// The playlist name is looked up only when the context changed since
/// `previous`; otherwise the previous name is reused.
pub async fn playback_snapshot(
    session: &Session,
    previous: &Snapshot,
) -> Result<Snapshot, FeatureError> {
    let playback = session.client().current_playback().await?;
    let devices = session.devices().list();
    let view = PlaybackView::from_playback(playback.as_ref(), &devices);

    let context = playback.as_ref().and_then(|p| p.context.as_ref());
    let playlist = match context {
        Some(context) if context.kind == "playlist" && !context.uri.is_empty() => {
            if attribute_str(previous, "media_context_uri") == Some(context.uri.as_str()) {
                attribute_str(previous, "media_playlist").map(str::to_string)
            } else {
                Some(session.client().playlist(&context.uri).await?.name)
            }
        }
        _ => None,
    };

    Ok(view.with_playlist(playlist).into_snapshot())
}

/// Builds the start-playback request for `media_type`/`media_id`, or `None`
/// when the media type cannot be played.
pub fn media_request(media_type: &str, media_id: &str) -> Option<PlaybackRequest> {
    let media_type = media_type
        .strip_prefix(MEDIA_TYPE_PREFIX)
        .unwrap_or(media_type);
    let media_id = strip_media_uri(media_id);

    match media_type {
        "track" | "episode" | "music" => Some(PlaybackRequest {
            uris: Some(vec![media_id]),
            ..Default::default()
        }),
        "playlist" | "album" | "artist" | "show" => Some(PlaybackRequest {
            context_uri: Some(media_id),
            ..Default::default()
        }),
        _ => None,
    }
}

/// Runs one playback command. `current` is the last `player` snapshot.
pub async fn execute(
    session: &Session,
    command: &PlayerCommand,
    current: &Snapshot,
) -> Result<(), FeatureError> {
    let client = session.client();

    match command {
        PlayerCommand::Play => client.start_playback(&PlaybackRequest::default()).await?,
        PlayerCommand::Pause => client.pause_playback().await?,
        PlayerCommand::Next => client.next_track().await?,
        PlayerCommand::Previous => client.previous_track().await?,
        PlayerCommand::Seek(seconds) => {
            let position_ms = (seconds.max(0.0) * 1000.0) as u64;
            client.seek(position_ms).await?
        }
        PlayerCommand::Volume(level) => {
            let percent = (level.clamp(0.0, 1.0) * 100.0) as u8;
            client.set_volume(percent).await?
        }
        PlayerCommand::Shuffle(shuffle) => client.set_shuffle(*shuffle).await?,
        PlayerCommand::Repeat(mode) => client.set_repeat(mode.to_remote()).await?,
        PlayerCommand::SelectSource(name) => {
            let Some(device_id) = session.devices().find_by_name(name).and_then(|d| d.id) else {
                debug!(source = %name, "unknown source, ignoring");
                return Ok(());
            };
            let playing = current.state == PlayerState::Playing.as_str();
            client.transfer_playback(&device_id, playing).await?
        }
        PlayerCommand::PlayMedia {
            media_type,
            media_id,
        } => {
            let Some(mut request) = media_request(media_type, media_id) else {
                error!(media_type = %media_type, "media type is not supported");
                return Ok(());
            };
            if attribute_str(current, "media_current_device_id").is_none() {
                request.device_id = session.devices().first().and_then(|d| d.id);
            }
            debug!(?request, "play media");
            client.start_playback(&request).await?
        }
    }

    Ok(())
}

/// Periodic playback poller publishing into the board.
pub struct PlaybackMirror {
    session: Arc<Session>,
    board: Arc<StateBoard>,
}

impl PlaybackMirror {
    pub fn new(session: Arc<Session>, board: Arc<StateBoard>) -> Self {
        Self { session, board }
    }

    /// One poll: refreshes the token if needed and publishes the result.
    pub async fn poll(&self) -> Result<Arc<Snapshot>, FeatureError> {
        self.session.ensure_token_valid().await;
        let previous = self.board.current(Feature::Player);
        match playback_snapshot(&self.session, &previous).await {
            Ok(snapshot) => Ok(self.board.publish(snapshot)),
            Err(e @ FeatureError::Unavailable(_)) => {
                self.board.mark_unavailable(Feature::Player);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Polls every `period` until the task is dropped.
    pub async fn run(self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = self.poll().await {
                warn!(error = %e, "playback poll failed");
            }
        }
    }
}
