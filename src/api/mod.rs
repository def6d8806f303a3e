//! # API Module
//!
//! HTTP endpoints of the short-lived local server that `spotplus auth` runs
//! while the user authorizes the application in the browser.
//!
//! - [`callback`] receives the authorization code from Spotify's redirect and
//!   exchanges it for a token using the stored PKCE verifier.
//! - [`health`] reports the service name and version.
//!
//! Both handlers are mounted by [`crate::server::start_api_server`].

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
