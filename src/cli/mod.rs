//! # CLI Module
//!
//! The command-line stand-in for a host platform. It owns the OAuth token,
//! connects a [`Session`](crate::session::Session), dispatches one
//! [`Command`] per invocation and persists what the command published.
//!
//! ```text
//! clap subcommand
//!     ↓
//! Command  ──→  Dispatcher  ──→  feature handler  ──→  SpotifyApi
//!                   ↓
//!              StateBoard  ──→  SnapshotStore (<data_local_dir>/spotplus/state)
//! ```
//!
//! ## Usage
//!
//! ```bash
//! spotplus auth                          # authorize once
//! spotplus build --energy 80 --count 40  # recommendation playlist
//! spotplus search "radiohead" --artist   # artist profile
//! spotplus song                          # what is playing right now
//! spotplus follow track                  # save the current track
//! spotplus watch                         # live playback mirror
//! spotplus state music-machine           # last stored result
//! ```

mod auth;
mod render;
mod runtime;
mod watch;

pub use auth::auth;
pub use render::print_snapshot;
pub use runtime::{Runtime, connect, spinner};
pub use watch::watch;

use crate::{
    command::{Command, Outcome},
    management::SnapshotStore,
    state::{Feature, Snapshot},
    success, warning,
};

/// Runs a single command and prints its result.
pub async fn run(command: Command, message: &str) {
    let rt = connect().await;
    match rt.run(command, message).await {
        Outcome::Published(snapshot) => print_snapshot(&snapshot),
        Outcome::Done => success!("Done."),
    }
}

/// Prints the stored snapshot of `feature` without contacting Spotify.
pub async fn show_state(feature: Feature) {
    match SnapshotStore::default().load(feature).await {
        Ok(Some(snapshot)) => print_snapshot(&snapshot),
        Ok(None) => print_snapshot(&Snapshot::idle(feature)),
        Err(e) => warning!("Failed to load {} state: {}", feature, e),
    }
}
