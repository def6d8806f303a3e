//! # Command dispatch
//!
//! Every invokable service is one [`Command`] variant carrying its typed
//! request. The [`Dispatcher`] routes a command to its handler and applies
//! the result to the [`StateBoard`]:
//!
//! - a returned snapshot is published and handed back as
//!   [`Outcome::Published`]
//! - [`FeatureError::Unavailable`] marks the feature unavailable, keeping the
//!   previous state and attributes
//! - any other error leaves the board untouched
//!
//! Failures never touch the snapshot of another feature.

use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    artists,
    error::FeatureError,
    extras, history,
    player::{self, PlayerCommand},
    playlists, profile,
    recommend::{self, MusicMachineRequest},
    search::{self, SearchRequest},
    session::Session,
    song::{self, FollowRequest},
    state::{Feature, Snapshot, StateBoard},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BuildPlaylist(MusicMachineRequest),
    Search(SearchRequest),
    CategoryPlaylists { category_id: String },
    AddToHistory,
    HistoryAnalysis,
    Follow(FollowRequest),
    Unfollow(FollowRequest),
    QueueAndRecent,
    Playlists,
    MyArtists,
    TopArtists,
    SongData,
    Profile,
    Player(PlayerCommand),
    RefreshPlayback,
}

impl Command {
    /// The feature whose snapshot the command publishes or affects.
    pub fn feature(&self) -> Feature {
        match self {
            Command::BuildPlaylist(_) => Feature::MusicMachine,
            Command::Search(_) => Feature::Search,
            Command::CategoryPlaylists { .. } => Feature::CategoryPlaylists,
            Command::AddToHistory => Feature::AddToHistory,
            Command::HistoryAnalysis => Feature::HistoryAnalysis,
            Command::Follow(_) | Command::Unfollow(_) | Command::SongData => Feature::SongData,
            Command::QueueAndRecent => Feature::Extras,
            Command::Playlists => Feature::Playlists,
            Command::MyArtists => Feature::MyArtists,
            Command::TopArtists => Feature::TopArtists,
            Command::Profile => Feature::Profile,
            Command::Player(_) | Command::RefreshPlayback => Feature::Player,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Published(Arc<Snapshot>),
    Done,
}

impl Outcome {
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            Outcome::Published(snapshot) => Some(snapshot),
            Outcome::Done => None,
        }
    }
}

pub struct Dispatcher {
    session: Arc<Session>,
    board: Arc<StateBoard>,
    rng: Mutex<StdRng>,
}

impl Dispatcher {
    pub fn new(session: Arc<Session>, board: Arc<StateBoard>) -> Self {
        Self::with_rng(session, board, StdRng::from_rng(&mut rand::rng()))
    }

    /// Uses `rng` for all sampling, which makes builder runs reproducible.
    pub fn with_rng(session: Arc<Session>, board: Arc<StateBoard>, rng: StdRng) -> Self {
        Self {
            session,
            board,
            rng: Mutex::new(rng),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn board(&self) -> &Arc<StateBoard> {
        &self.board
    }

    pub async fn dispatch(&self, command: Command) -> Result<Outcome, FeatureError> {
        let feature = command.feature();
        debug!(%feature, "dispatching command");

        match self.run(command).await {
            Ok(Some(snapshot)) => Ok(Outcome::Published(self.board.publish(snapshot))),
            Ok(None) => Ok(Outcome::Done),
            Err(e @ FeatureError::Unavailable(_)) => {
                warn!(%feature, error = %e, "feature unavailable");
                self.board.mark_unavailable(feature);
                Err(e)
            }
            Err(e) => {
                warn!(%feature, error = %e, "command failed");
                Err(e)
            }
        }
    }

    async fn run(&self, command: Command) -> Result<Option<Snapshot>, FeatureError> {
        let session = self.session.as_ref();

        let snapshot = match command {
            Command::BuildPlaylist(request) => {
                let mut rng = self.rng.lock().await;
                recommend::build(session, request, &mut rng).await?
            }
            Command::Search(request) => search::search(session, request).await?,
            Command::CategoryPlaylists { category_id } => {
                search::category_playlists(session, &category_id).await?
            }
            Command::AddToHistory => {
                let previous = self.board.current(Feature::AddToHistory);
                history::add_to_history(session, &previous.state).await?
            }
            Command::HistoryAnalysis => history::history_analysis(session).await?,
            Command::Follow(request) => {
                let now_playing = self.board.now_playing();
                song::set_following(session, &request, now_playing.as_ref(), true).await?;
                return Ok(None);
            }
            Command::Unfollow(request) => {
                let now_playing = self.board.now_playing();
                song::set_following(session, &request, now_playing.as_ref(), false).await?;
                return Ok(None);
            }
            Command::QueueAndRecent => extras::queue_and_recent(session).await?,
            Command::Playlists => playlists::playlists(session).await?,
            Command::MyArtists => artists::my_artists(session).await?,
            Command::TopArtists => artists::top_artists(session).await?,
            Command::SongData => {
                let (snapshot, now_playing) = song::song_data(session).await?;
                self.board.set_now_playing(now_playing);
                snapshot
            }
            Command::Profile => profile::profile(session).await?,
            Command::Player(command) => {
                let current = self.board.current(Feature::Player);
                player::execute(session, &command, &current).await?;
                return Ok(None);
            }
            Command::RefreshPlayback => {
                let previous = self.board.current(Feature::Player);
                player::playback_snapshot(session, &previous).await?
            }
        };

        Ok(Some(snapshot))
    }
}
