//! Observable feature state.
//!
//! Every feature owns exactly one [`Snapshot`]: a short state string plus a
//! JSON attribute bag. Handlers never mutate a snapshot; they build a new one
//! and the [`StateBoard`] swaps it in atomically, so readers always see either
//! the previous or the next result and never a half-written one.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Search,
    CategoryPlaylists,
    MusicMachine,
    AddToHistory,
    HistoryAnalysis,
    Extras,
    Playlists,
    MyArtists,
    TopArtists,
    SongData,
    Profile,
    Player,
}

impl Feature {
    pub const ALL: [Feature; 12] = [
        Feature::Search,
        Feature::CategoryPlaylists,
        Feature::MusicMachine,
        Feature::AddToHistory,
        Feature::HistoryAnalysis,
        Feature::Extras,
        Feature::Playlists,
        Feature::MyArtists,
        Feature::TopArtists,
        Feature::SongData,
        Feature::Profile,
        Feature::Player,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Search => "search",
            Feature::CategoryPlaylists => "category_playlists",
            Feature::MusicMachine => "music_machine",
            Feature::AddToHistory => "add_to_history",
            Feature::HistoryAnalysis => "history_analysis",
            Feature::Extras => "extras",
            Feature::Playlists => "playlists",
            Feature::MyArtists => "my_artists",
            Feature::TopArtists => "top_artists",
            Feature::SongData => "song_data",
            Feature::Profile => "profile",
            Feature::Player => "player",
        }
    }

    /// State string shown before the feature has produced any result.
    pub fn idle_state(&self) -> &'static str {
        match self {
            Feature::Search => "No Search",
            Feature::CategoryPlaylists
            | Feature::Playlists
            | Feature::MyArtists
            | Feature::TopArtists => "No Data",
            Feature::MusicMachine => "No Recent Activity",
            Feature::AddToHistory => "No Recent Additions",
            Feature::HistoryAnalysis => "No Recent Analysis",
            Feature::Extras | Feature::SongData => "No Current Song",
            Feature::Profile => "Unknown",
            Feature::Player => "idle",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Feature::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| format!("unknown feature: {}", s))
    }
}

/// Immutable result of one feature invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub feature: Feature,
    pub state: String,
    pub attributes: Value,
    pub available: bool,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(feature: Feature, state: impl Into<String>, attributes: Value) -> Self {
        Self {
            feature,
            state: state.into(),
            attributes,
            available: true,
            updated_at: Utc::now(),
        }
    }

    pub fn idle(feature: Feature) -> Self {
        Self::new(feature, feature.idle_state(), Value::Object(Map::new()))
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn is_idle(&self) -> bool {
        self.state == self.feature.idle_state()
    }
}

/// Identifiers of what is currently playing, used as defaults by the
/// follow/unfollow commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub track_id: Option<String>,
    pub track_uri: Option<String>,
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
    pub context_uri: Option<String>,
}

impl NowPlaying {
    /// Recovers the identifiers from a published song-data snapshot.
    /// Returns `None` for the idle snapshot.
    pub fn from_song_data(snapshot: &Snapshot) -> Option<Self> {
        if snapshot.feature != Feature::SongData {
            return None;
        }
        let spotify = snapshot.attribute("spotify")?;
        let field = |key: &str| {
            spotify
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            track_id: field("spotify_track_id"),
            track_uri: field("spotify_track_uri"),
            artist_id: field("spotify_artist_id"),
            album_id: field("spotify_album_id"),
            context_uri: field("spotify_context_URI"),
        })
    }
}

/// One watch channel per feature plus the now-playing context.
pub struct StateBoard {
    channels: HashMap<Feature, watch::Sender<Arc<Snapshot>>>,
    now_playing: watch::Sender<Option<NowPlaying>>,
}

impl Default for StateBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBoard {
    pub fn new() -> Self {
        let channels = Feature::ALL
            .into_iter()
            .map(|f| (f, watch::Sender::new(Arc::new(Snapshot::idle(f)))))
            .collect();

        Self {
            channels,
            now_playing: watch::Sender::new(None),
        }
    }

    fn channel(&self, feature: Feature) -> &watch::Sender<Arc<Snapshot>> {
        // Every variant is inserted in `new`.
        &self.channels[&feature]
    }

    /// Replaces the feature's snapshot and returns the published value.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.channel(snapshot.feature)
            .send_replace(Arc::clone(&snapshot));
        snapshot
    }

    /// Republishes the prior snapshot flagged as unavailable. State and
    /// attributes stay as they were.
    pub fn mark_unavailable(&self, feature: Feature) -> Arc<Snapshot> {
        let mut snapshot = (*self.current(feature)).clone();
        snapshot.available = false;
        self.publish(snapshot)
    }

    pub fn current(&self, feature: Feature) -> Arc<Snapshot> {
        Arc::clone(&self.channel(feature).borrow())
    }

    pub fn subscribe(&self, feature: Feature) -> watch::Receiver<Arc<Snapshot>> {
        self.channel(feature).subscribe()
    }

    /// Seeds the board with snapshots persisted by a previous run. The
    /// now-playing context is rebuilt from a restored song-data snapshot.
    pub fn restore(&self, snapshots: impl IntoIterator<Item = Snapshot>) {
        for snapshot in snapshots {
            if snapshot.feature == Feature::SongData {
                self.set_now_playing(NowPlaying::from_song_data(&snapshot));
            }
            self.channel(snapshot.feature)
                .send_replace(Arc::new(snapshot));
        }
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.now_playing.borrow().clone()
    }

    pub fn set_now_playing(&self, now_playing: Option<NowPlaying>) {
        self.now_playing.send_replace(now_playing);
    }

    pub fn subscribe_now_playing(&self) -> watch::Receiver<Option<NowPlaying>> {
        self.now_playing.subscribe()
    }
}

