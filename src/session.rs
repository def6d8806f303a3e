//! Per-account session.
//!
//! A [`Session`] is created once per connection and shared read-only by all
//! feature handlers: the authenticated client, the cached user profile, the
//! account settings and the polled [`DeviceCache`].

use std::{collections::HashSet, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, warn};

use crate::{
    config::{SPOTIFY_SCOPES, Settings},
    error::{ApiError, SessionError},
    management::TokenManager,
    spotify::{LyricsLookup, SpotifyApi},
    types::{Device, UserProfile},
};

/// Scopes from `SPOTIFY_SCOPES` that `granted` does not contain.
pub fn missing_scopes(granted: &str) -> Vec<&'static str> {
    let granted: HashSet<&str> = granted.split_whitespace().collect();
    SPOTIFY_SCOPES
        .iter()
        .copied()
        .filter(|scope| !granted.contains(scope))
        .collect()
}

/// Ordered list of playback targets, replaced wholesale on every refresh.
#[derive(Clone)]
pub struct DeviceCache {
    client: Arc<dyn SpotifyApi>,
    devices: Arc<watch::Sender<Arc<Vec<Device>>>>,
}

impl DeviceCache {
    pub fn new(client: Arc<dyn SpotifyApi>) -> Self {
        Self {
            client,
            devices: Arc::new(watch::Sender::new(Arc::new(Vec::new()))),
        }
    }

    /// Fetches the device list. On failure the previous list stays in place.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        match self.client.devices().await {
            Ok(devices) => {
                debug!(count = devices.len(), "device list refreshed");
                self.devices.send_replace(Arc::new(devices));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "device refresh failed, keeping previous list");
                Err(e)
            }
        }
    }

    pub fn list(&self) -> Arc<Vec<Device>> {
        Arc::clone(&self.devices.borrow())
    }

    pub fn find_by_name(&self, name: &str) -> Option<Device> {
        self.list().iter().find(|d| d.name == name).cloned()
    }

    pub fn first(&self) -> Option<Device> {
        self.list().first().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Device>>> {
        self.devices.subscribe()
    }
}

pub struct Session {
    client: Arc<dyn SpotifyApi>,
    profile: UserProfile,
    settings: Settings,
    lyrics: Option<Arc<dyn LyricsLookup>>,
    devices: DeviceCache,
    tokens: Option<Arc<Mutex<TokenManager>>>,
}

impl Session {
    /// Validates the granted scopes, fetches the profile and performs the
    /// first device refresh.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ReauthRequired`] when scopes are missing or the
    ///   token is rejected
    /// - [`SessionError::NotReady`] when the service cannot be reached or
    ///   returns an empty profile
    pub async fn connect(
        client: Arc<dyn SpotifyApi>,
        granted_scope: &str,
        settings: Settings,
        lyrics: Option<Arc<dyn LyricsLookup>>,
    ) -> Result<Self, SessionError> {
        let missing = missing_scopes(granted_scope);
        if !missing.is_empty() {
            return Err(SessionError::ReauthRequired(format!(
                "missing scopes: {}",
                missing.join(" ")
            )));
        }

        let profile = match client.me().await {
            Ok(profile) => profile,
            Err(e) if e.is_unauthorized() => {
                return Err(SessionError::ReauthRequired(e.to_string()));
            }
            Err(e) => return Err(SessionError::NotReady(e.to_string())),
        };

        if profile.id.is_empty() {
            return Err(SessionError::NotReady("empty user profile".to_string()));
        }

        let devices = DeviceCache::new(Arc::clone(&client));
        // A failed first refresh is not fatal; polling fills the cache later.
        let _ = devices.refresh().await;

        Ok(Self {
            client,
            profile,
            settings,
            lyrics,
            devices,
            tokens: None,
        })
    }

    /// Attaches the token store used by [`Session::ensure_token_valid`].
    pub fn with_token_manager(mut self, tokens: Arc<Mutex<TokenManager>>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Refreshes the access token when it is near expiry and swaps it into
    /// the shared client.
    pub async fn ensure_token_valid(&self) {
        if let Some(tokens) = &self.tokens {
            let token = tokens.lock().await.get_valid_token().await;
            self.client.set_access_token(&token);
        }
    }

    /// Refreshes the device list every `period` until the handle is aborted.
    pub fn spawn_device_polling(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately and `connect` already refreshed.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                session.ensure_token_valid().await;
                let _ = session.devices.refresh().await;
            }
        })
    }

    pub fn client(&self) -> &Arc<dyn SpotifyApi> {
        &self.client
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn lyrics(&self) -> Option<&Arc<dyn LyricsLookup>> {
        self.lyrics.as_ref()
    }

    pub fn devices(&self) -> &DeviceCache {
        &self.devices
    }

    /// The account's country, used as market for catalogue requests.
    pub fn market(&self) -> Option<&str> {
        Some(self.profile.country.as_str()).filter(|c| !c.is_empty())
    }

    pub fn user_id(&self) -> &str {
        &self.profile.id
    }
}
