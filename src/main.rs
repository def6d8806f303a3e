use clap::{
    Args, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use spotplus::{
    cli,
    command::Command as ServiceCommand,
    config, error,
    player::{PlayerCommand, RepeatMode},
    recommend::{MusicMachineRequest, Targets, parse_seeds},
    search::{SearchRequest, SearchType},
    song::{FollowKind, FollowRequest},
    spotify::TimeRange,
    state::Feature,
};

const DEFAULT_LOG_FILTER: &str = "spotplus=info,warn";

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Build a recommendation playlist
    Build(BuildOptions),

    /// Search tracks, albums and playlists or look up an artist profile
    Search(SearchOptions),

    /// List the playlists of a browse category
    Categories(CategoryOptions),

    /// Maintain and analyse the history playlist
    History(HistoryOptions),

    /// Add an artist, album, track or playlist to the library
    Follow(FollowOptions),

    /// Remove an artist, album, track or playlist from the library
    Unfollow(FollowOptions),

    /// Show the queue and recently played tracks
    Queue,

    /// List your playlists with their audio profile
    Playlists,

    /// List followed or top artists with their editorial playlists
    Artists(ArtistsOptions),

    /// Details about the song that is playing
    Song,

    /// Account summary
    Profile,

    /// Control playback
    Player(PlayerOptions),

    /// Mirror playback live until Ctrl-C
    Watch,

    /// Print the stored state of a feature
    State(StateOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Args, Debug, Clone)]
pub struct BuildOptions {
    /// Playlist name
    #[clap(long, default_value = "Spotify Plus")]
    pub name: String,

    /// Number of tracks (defaults to SPOTPLUS_TRACK_COUNT)
    #[clap(long)]
    pub count: Option<usize>,

    /// Tolerance around each target in percent (defaults to SPOTPLUS_TOLERANCE)
    #[clap(long)]
    pub tolerance: Option<f64>,

    /// Sample followed artists instead of top artists
    #[clap(long)]
    pub focus: bool,

    /// Time range for top items: short, medium or long
    #[clap(long, default_value = "long_term")]
    pub time_range: TimeRange,

    /// Start playback when done
    #[clap(long)]
    pub play_now: bool,

    /// Only queue the tracks, do not write a playlist
    #[clap(long)]
    pub no_playlist: bool,

    /// Transfer playback to this device first
    #[clap(long)]
    pub device: Option<String>,

    /// Comma separated seed artist ids
    #[clap(long)]
    pub seed_artists: Option<String>,

    /// Comma separated seed genres
    #[clap(long)]
    pub seed_genres: Option<String>,

    /// Comma separated seed track ids
    #[clap(long)]
    pub seed_tracks: Option<String>,

    #[clap(long)]
    pub valence: Option<f64>,
    #[clap(long)]
    pub energy: Option<f64>,
    #[clap(long)]
    pub acousticness: Option<f64>,
    #[clap(long)]
    pub danceability: Option<f64>,
    #[clap(long)]
    pub instrumentalness: Option<f64>,
    #[clap(long)]
    pub liveness: Option<f64>,
    #[clap(long)]
    pub speechiness: Option<f64>,
    #[clap(long)]
    pub popularity: Option<f64>,
}

impl BuildOptions {
    fn into_request(self) -> MusicMachineRequest {
        let seeds = |raw: Option<String>| raw.as_deref().map(parse_seeds).unwrap_or_default();

        MusicMachineRequest {
            tolerance_percent: self.tolerance,
            name: self.name,
            count: self.count,
            focus: self.focus,
            time_range: self.time_range,
            play_now: self.play_now,
            create_playlist: !self.no_playlist,
            device_name: self.device,
            seed_artists: seeds(self.seed_artists),
            seed_genres: seeds(self.seed_genres),
            seed_tracks: seeds(self.seed_tracks),
            targets: Targets {
                valence: self.valence,
                energy: self.energy,
                acousticness: self.acousticness,
                danceability: self.danceability,
                instrumentalness: self.instrumentalness,
                liveness: self.liveness,
                speechiness: self.speechiness,
                popularity: self.popularity,
            },
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SearchOptions {
    /// Search term
    pub term: String,

    /// Look up the artist profile instead of a general search
    #[clap(long)]
    pub artist: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryOptions {
    /// Category id, see `spotplus profile` for the list
    pub category_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryOptions {
    #[command(subcommand)]
    pub command: HistorySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HistorySubcommand {
    /// Move the current track to the top of the history playlist
    Add,
    /// Count plays per artist in the history playlist
    Analyze,
}

#[derive(Args, Debug, Clone)]
pub struct FollowOptions {
    /// artist, album, track or playlist
    pub kind: FollowKind,

    /// Explicit id or uri; defaults to what is currently playing
    #[clap(long)]
    pub id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ArtistsOptions {
    #[command(subcommand)]
    pub command: ArtistsSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ArtistsSubcommand {
    /// Followed artists
    Mine,
    /// Top artists
    Top,
}

#[derive(Args, Debug, Clone)]
pub struct PlayerOptions {
    #[command(subcommand)]
    pub action: PlayerAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlayerAction {
    /// Print the current playback
    Status,
    Play,
    Pause,
    Next,
    Previous,
    /// Seek to a position in seconds
    Seek { seconds: f64 },
    /// Set the volume between 0 and 1
    Volume { level: f64 },
    /// Transfer playback to a device by name
    Source { name: String },
    Shuffle {
        #[clap(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// off, all or one
    Repeat { mode: RepeatMode },
    /// Play a track, album, playlist, artist, show or episode
    Media { media_type: String, media_id: String },
}

impl PlayerAction {
    fn into_command(self) -> ServiceCommand {
        let command = match self {
            PlayerAction::Status => return ServiceCommand::RefreshPlayback,
            PlayerAction::Play => PlayerCommand::Play,
            PlayerAction::Pause => PlayerCommand::Pause,
            PlayerAction::Next => PlayerCommand::Next,
            PlayerAction::Previous => PlayerCommand::Previous,
            PlayerAction::Seek { seconds } => PlayerCommand::Seek(seconds),
            PlayerAction::Volume { level } => PlayerCommand::Volume(level),
            PlayerAction::Source { name } => PlayerCommand::SelectSource(name),
            PlayerAction::Shuffle { enabled } => PlayerCommand::Shuffle(enabled),
            PlayerAction::Repeat { mode } => PlayerCommand::Repeat(mode),
            PlayerAction::Media {
                media_type,
                media_id,
            } => PlayerCommand::PlayMedia {
                media_type,
                media_id,
            },
        };
        ServiceCommand::Player(command)
    }
}

#[derive(Args, Debug, Clone)]
pub struct StateOptions {
    /// Feature name, e.g. music-machine or song-data
    pub feature: Feature,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => cli::auth().await,
        Command::Build(opt) => {
            cli::run(
                ServiceCommand::BuildPlaylist(opt.into_request()),
                "Building recommendations...",
            )
            .await
        }
        Command::Search(opt) => {
            let search_type = if opt.artist {
                SearchType::ArtistProfile
            } else {
                SearchType::General
            };
            let request = SearchRequest {
                term: opt.term,
                search_type,
            };
            cli::run(ServiceCommand::Search(request), "Searching...").await
        }
        Command::Categories(opt) => {
            cli::run(
                ServiceCommand::CategoryPlaylists {
                    category_id: opt.category_id,
                },
                "Fetching category playlists...",
            )
            .await
        }
        Command::History(opt) => match opt.command {
            HistorySubcommand::Add => {
                cli::run(ServiceCommand::AddToHistory, "Updating history playlist...").await
            }
            HistorySubcommand::Analyze => {
                cli::run(ServiceCommand::HistoryAnalysis, "Analysing history...").await
            }
        },
        Command::Follow(opt) => {
            let request = FollowRequest {
                kind: opt.kind,
                id: opt.id,
            };
            cli::run(ServiceCommand::Follow(request), "Updating library...").await
        }
        Command::Unfollow(opt) => {
            let request = FollowRequest {
                kind: opt.kind,
                id: opt.id,
            };
            cli::run(ServiceCommand::Unfollow(request), "Updating library...").await
        }
        Command::Queue => cli::run(ServiceCommand::QueueAndRecent, "Fetching queue...").await,
        Command::Playlists => {
            cli::run(ServiceCommand::Playlists, "Analysing playlists...").await
        }
        Command::Artists(opt) => match opt.command {
            ArtistsSubcommand::Mine => {
                cli::run(ServiceCommand::MyArtists, "Fetching followed artists...").await
            }
            ArtistsSubcommand::Top => {
                cli::run(ServiceCommand::TopArtists, "Fetching top artists...").await
            }
        },
        Command::Song => cli::run(ServiceCommand::SongData, "Fetching song data...").await,
        Command::Profile => cli::run(ServiceCommand::Profile, "Loading profile...").await,
        Command::Player(opt) => cli::run(opt.action.into_command(), "Talking to the player...").await,
        Command::Watch => cli::watch().await,
        Command::State(opt) => cli::show_state(opt.feature).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
