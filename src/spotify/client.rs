use std::{sync::RwLock, time::Duration};

use reqwest::{Client, Method, Response, StatusCode, header::CONTENT_LENGTH};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{config, error::ApiError};

/// Attempts per request when the API answers with 502 Bad Gateway.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// reqwest backed implementation of [`SpotifyApi`](super::SpotifyApi).
///
/// The access token sits behind a lock so a refreshed token can be swapped
/// in while handlers keep sharing the client.
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    token: RwLock<String>,
}

impl SpotifyClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(config::spotify_apiurl(), access_token)
    }

    pub fn with_base_url(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(access_token.into()),
        }
    }

    pub(crate) fn access_token(&self) -> String {
        self.token
            .read()
            .map(|t| t.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub(crate) fn replace_token(&self, token: &str) {
        match self.token.write() {
            Ok(mut guard) => *guard = token.to_string(),
            Err(poisoned) => *poisoned.into_inner() = token.to_string(),
        }
    }

    /// Sends one request, retrying on 502 and decoding API error bodies.
    async fn send<Q, B>(
        &self,
        method: Method,
        path: &str,
        query: &Q,
        body: Option<&B>,
    ) -> Result<Response, ApiError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(self.access_token())
                .query(query);
            let request = match body {
                Some(body) => request.json(body),
                None => request.header(CONTENT_LENGTH, 0),
            };

            debug!(%method, path, attempt, "spotify request");
            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::BAD_GATEWAY && attempt < MAX_ATTEMPTS {
                warn!(path, attempt, "bad gateway from spotify, retrying");
                sleep(RETRY_DELAY).await;
                continue;
            }

            if status.is_success() {
                return Ok(response);
            }

            return Err(Self::decode_error(status, response).await);
        }
    }

    async fn decode_error(status: StatusCode, response: Response) -> ApiError {
        let text = response.text().await.unwrap_or_default();
        let (reason, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => (envelope.error.reason, envelope.error.message),
            Err(_) if !text.trim().is_empty() => (None, Some(text)),
            Err(_) => (None, status.canonical_reason().map(str::to_string)),
        };
        ApiError::from_status(status.as_u16(), reason, message)
    }

    pub(crate) async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.send(Method::GET, path, query, None::<&()>).await?;
        Ok(response.json::<T>().await?)
    }

    /// GET for endpoints that answer `204 No Content` when there is nothing
    /// to report, such as the player endpoints.
    pub(crate) async fn get_optional<T, Q>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.send(Method::GET, path, query, None::<&()>).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ApiError::Remote {
                status: 200,
                reason: format!("malformed response: {}", e),
            })
    }

    pub(crate) async fn post<T, Q, B>(&self, path: &str, query: &Q, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let response = self.send(Method::POST, path, query, Some(body)).await?;
        Ok(response.json::<T>().await?)
    }

    /// Sends a request whose response body is irrelevant.
    pub(crate) async fn execute<Q, B>(
        &self,
        method: Method,
        path: &str,
        query: &Q,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        self.send(method, path, query, body).await.map(|_| ())
    }
}
