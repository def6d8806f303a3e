use std::path::PathBuf;

use chrono::Utc;
use tracing::warn;

use crate::{config, spotify, types::Token};

/// Seconds before the real expiry at which a token is treated as expired.
const EXPIRY_MARGIN: u64 = 240;

/// Owns the persisted OAuth token and refreshes it when it is about to
/// expire.
pub struct TokenManager {
    token: Token,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager { token }
    }

    /// Loads the token written by a previous `spotplus auth`.
    pub async fn load() -> Result<Self, String> {
        let path = Self::token_path();
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self { token })
    }

    pub async fn persist(&self) -> Result<(), String> {
        let path = Self::token_path();
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(path, json).await.map_err(|e| e.to_string())
    }

    /// Returns an access token, refreshing and persisting it first when it
    /// is close to expiry. A failed refresh keeps the current token.
    pub async fn get_valid_token(&mut self) -> String {
        if self.is_expired() {
            match spotify::auth::refresh_token(&self.token.refresh_token).await {
                Ok(new_token) => {
                    self.token = new_token;
                    if let Err(e) = self.persist().await {
                        warn!(error = %e, "failed to persist refreshed token");
                    }
                }
                Err(e) => warn!(error = %e, "token refresh failed"),
            }
        }

        self.token.access_token.clone()
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + EXPIRY_MARGIN >= self.token.obtained_at + self.token.expires_in
    }

    /// Scopes granted with the token, as a space separated list.
    pub fn granted_scope(&self) -> &str {
        &self.token.scope
    }

    fn token_path() -> PathBuf {
        config::data_dir().join("cache").join("token.json")
    }

    pub fn current_token(&self) -> &Token {
        &self.token
    }
}
