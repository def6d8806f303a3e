use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Mutex;

use crate::{
    command::{Command, Dispatcher, Outcome},
    config::Settings,
    error,
    management::{SnapshotStore, TokenManager},
    session::Session,
    spotify::{LyricsLookup, MusixmatchClient, SpotifyApi, SpotifyClient},
    state::StateBoard,
    warning,
};

/// Everything a command needs: the dispatcher over a connected session and
/// the store the published snapshots are written to.
pub struct Runtime {
    pub dispatcher: Dispatcher,
    pub store: SnapshotStore,
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

/// Restores the board, loads the token and connects the session.
///
/// Exits the process when no token is stored or the session cannot be
/// established.
pub async fn connect() -> Runtime {
    let store = SnapshotStore::default();
    let board = Arc::new(StateBoard::new());
    board.restore(store.load_all().await);

    let mut token_mgr = match TokenManager::load().await {
        Ok(t) => t,
        Err(e) => {
            error!(
                "Failed to load token. Please run spotplus auth\n Error: {}",
                e
            );
        }
    };

    let access_token = token_mgr.get_valid_token().await;
    let granted_scope = token_mgr.granted_scope().to_string();

    let settings = Settings::from_env();
    let lyrics: Option<Arc<dyn LyricsLookup>> = settings
        .lyrics_api_token
        .as_ref()
        .map(|token| Arc::new(MusixmatchClient::new(token.clone())) as Arc<dyn LyricsLookup>);
    let client: Arc<dyn SpotifyApi> = Arc::new(SpotifyClient::new(access_token));

    let pb = spinner("Connecting to Spotify...");
    let session = Session::connect(client, &granted_scope, settings, lyrics).await;
    pb.finish_and_clear();

    let session = match session {
        Ok(session) => session.with_token_manager(Arc::new(Mutex::new(token_mgr))),
        Err(e) => {
            error!("{}. Please run spotplus auth if the problem persists.", e);
        }
    };

    Runtime {
        dispatcher: Dispatcher::new(Arc::new(session), board),
        store,
    }
}

impl Runtime {
    /// Dispatches `command` behind a spinner and persists whatever snapshot
    /// it published. Exits the process on failure.
    pub async fn run(&self, command: Command, message: &str) -> Outcome {
        let feature = command.feature();
        let pb = spinner(message);
        let result = self.dispatcher.dispatch(command).await;
        pb.finish_and_clear();

        match result {
            Ok(outcome) => {
                if let Some(snapshot) = outcome.snapshot() {
                    if let Err(e) = self.store.persist(snapshot).await {
                        warning!("Failed to store {} state: {}", feature, e);
                    }
                }
                outcome
            }
            Err(e) => {
                let current = self.dispatcher.board().current(feature);
                if !current.available {
                    if let Err(e) = self.store.persist(&current).await {
                        warning!("Failed to store {} state: {}", feature, e);
                    }
                }
                error!("{} failed: {}", feature, e);
            }
        }
    }
}
