//! Error types shared by the remote client, the session and the feature
//! handlers.
//!
//! Every remote call returns `Result<_, ApiError>`. Handlers convert that
//! into [`FeatureError`], and the dispatcher decides from the variant whether
//! the feature is marked unavailable or the previous snapshot simply stays in
//! place.

use thiserror::Error;

/// Remote reason string for playback commands sent without a target device.
pub const NO_ACTIVE_DEVICE: &str = "NO_ACTIVE_DEVICE";

/// Coarse classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    NoDevice,
    Remote,
}

/// Failure of a single call against the Web API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Transport level failure (connect, timeout, broken body).
    #[error("network error: {0}")]
    Transient(String),

    /// The API refused a player command because no device is active.
    #[error("No active playback device found")]
    NoDevice,

    /// Any other API reported error.
    #[error("Spotify error ({status}): {reason}")]
    Remote { status: u16, reason: String },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transient(_) => ErrorKind::Transient,
            ApiError::NoDevice => ErrorKind::NoDevice,
            ApiError::Remote { .. } => ErrorKind::Remote,
        }
    }

    /// Builds the error from an HTTP status and the optional `reason`/`message`
    /// found in the API error body.
    pub fn from_status(status: u16, reason: Option<String>, message: Option<String>) -> Self {
        if reason.as_deref() == Some(NO_ACTIVE_DEVICE) {
            return ApiError::NoDevice;
        }

        let reason = reason
            .or(message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        ApiError::Remote { status, reason }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Remote { status: 401, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ApiError::Remote {
                status: status.as_u16(),
                reason: err.to_string(),
            },
            None if err.is_decode() => ApiError::Remote {
                status: 200,
                reason: format!("malformed response: {}", err),
            },
            None => ApiError::Transient(err.to_string()),
        }
    }
}

/// Failure of one command invocation.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Transient network failure; the feature is shown as unavailable and the
    /// previous snapshot is retained.
    #[error("Spotify is unavailable: {0}")]
    Unavailable(String),

    #[error("No active playback device found")]
    NoActiveDevice,

    #[error("Spotify error: {0}")]
    Remote(String),

    /// Not enough candidates to draw the requested random sample from.
    #[error("need at least {needed} candidates to sample from, found {available}")]
    InsufficientCandidates { needed: usize, available: usize },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<ApiError> for FeatureError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transient(msg) => FeatureError::Unavailable(msg),
            ApiError::NoDevice => FeatureError::NoActiveDevice,
            ApiError::Remote { reason, .. } => FeatureError::Remote(reason),
        }
    }
}

/// Failure to establish a session for the account.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Granted scopes are insufficient or the token was rejected; the user
    /// has to authorize again.
    #[error("re-authorization required: {0}")]
    ReauthRequired(String),

    /// The service could not be reached or returned no profile; retry later.
    #[error("Spotify not ready: {0}")]
    NotReady(String),
}
