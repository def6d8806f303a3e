//! Spotify Plus toolkit library
//!
//! Drives the Spotify Web API for one authenticated account: a
//! recommendation playlist builder, search, library panels (artists,
//! playlists, queue, song details, profile), a history playlist and a
//! playback mirror. Every result is published as an immutable snapshot on a
//! per-feature state board that the CLI persists between runs.
//!
//! # Modules
//!
//! - `api` - HTTP handlers of the local OAuth callback server
//! - `artists` - followed and top artists with their editorial playlists
//! - `cli` - command-line front end
//! - `command` - typed commands and the dispatcher
//! - `config` - environment variables and account settings
//! - `error` - remote, feature and session error types
//! - `extras` - queue and recently played
//! - `history` - history playlist and play count analysis
//! - `management` - token and snapshot persistence
//! - `player` - playback mirror and playback commands
//! - `playlists` - the user's playlists with audio feature averages
//! - `profile` - account summary
//! - `recommend` - recommendation / playlist builder
//! - `search` - general search, artist profiles and category playlists
//! - `server` - local HTTP server for OAuth callbacks
//! - `session` - connected session and device cache
//! - `song` - song detail panel and follow/unfollow
//! - `spotify` - Spotify Web API seam and client
//! - `state` - feature snapshots and the state board
//! - `types` - API data structures
//! - `utils` - PKCE and formatting helpers
//!
//! # Example
//!
//! ```
//! use spotplus::{command::Command, config, cli};
//!
//! #[tokio::main]
//! async fn main() -> spotplus::Res<()> {
//!     config::load_env().await?;
//!     cli::run(Command::Profile, "Loading profile...").await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod artists;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod extras;
pub mod history;
pub mod management;
pub mod player;
pub mod playlists;
pub mod profile;
pub mod recommend;
pub mod search;
pub mod server;
pub mod session;
pub mod song;
pub mod spotify;
pub mod state;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Provides a standard error handling pattern throughout the application
/// using a boxed dynamic error trait object. This allows for flexible
/// error handling while maintaining Send + Sync bounds for async contexts.
///
/// # Type Parameters
///
/// - `T` - The success type returned on successful operations
///
/// # Example
///
/// ```
/// use spotplus::Res;
///
/// async fn fetch_data() -> Res<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Creates a formatted output line with a distinctive blue "o" indicator
/// followed by the provided message. Used for general information and
/// status updates throughout the application.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// info!("Starting authentication process...");
/// info!("Found {} playlists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// Creates a formatted output line with a green "✓" indicator to signify
/// successful completion of operations. Used to provide positive feedback
/// when operations complete successfully.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// success!("Authentication completed successfully");
/// success!("Published {} snapshots", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Creates a formatted error output with a red "!" indicator and immediately
/// terminates the program with exit code 1. Used for unrecoverable errors
/// that require immediate program termination.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Behavior
///
/// This macro will cause the program to exit immediately after printing
/// the error message. It should only be used for fatal errors where
/// recovery is not possible.
///
/// # Example
///
/// ```
/// error!("Failed to load configuration");
/// error!("Missing required environment variable: {}", var_name);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Creates a formatted output line with a yellow "!" indicator to highlight
/// potential issues or important notices that don't require program termination.
/// Used for recoverable issues or important information that users should notice.
///
/// # Arguments
///
/// The macro accepts the same arguments as `println!`, supporting format
/// strings and interpolation.
///
/// # Example
///
/// ```
/// warning!("No stored state found, starting idle");
/// warning!("Device {} not found", name);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
