//! REST side of the session: login and catalog retrieval.
//!
//! Every call takes the canonical endpoint explicitly so that an address
//! change made on the ip-config screen applies to the very next request.
//! No request timeout is configured; a hung server keeps the caller's loading
//! flag up until the connection eventually fails.

use async_trait::async_trait;
use echo_proto::protocol::{AccessLevel, LoginRequest, LoginResponse, Song, SongId};
use thiserror::Error;
use tracing::{debug, info};

/// Login failed. Shown to the user as one generic message whatever the cause.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login rejected (HTTP {0})")]
    Rejected(u16),
    #[error("server unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected login response: {0}")]
    BadResponse(String),
}

/// Catalog or song retrieval failed. Logged, never surfaced.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered HTTP {0}")]
    Status(u16),
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait SongApi: Send + Sync {
    /// `POST /api/login`. Returns the server-assigned access level, if any.
    async fn login(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<Option<AccessLevel>, AuthError>;

    /// `GET /api/songs`.
    async fn fetch_catalog(&self, endpoint: &str) -> Result<Vec<Song>, FetchError>;

    /// `GET /api/song/{id}`.
    async fn fetch_song(&self, endpoint: &str, id: SongId) -> Result<Song, FetchError>;
}

fn join(endpoint: &str, path: &str) -> String {
    format!("{}{}", endpoint.trim_end_matches('/'), path)
}

/// `SongApi` over HTTP with reqwest.
#[derive(Clone, Default)]
pub struct HttpSongApi {
    client: reqwest::Client,
}

impl HttpSongApi {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SongApi for HttpSongApi {
    async fn login(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<Option<AccessLevel>, AuthError> {
        let url = join(endpoint, "/api/login");
        debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(status.as_u16()));
        }
        let body: LoginResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::BadResponse(e.to_string()))?;
        info!(
            "login ok for {} (status={:?}, level={:?})",
            username, body.status, body.access_level
        );
        Ok(body.access_level)
    }

    async fn fetch_catalog(&self, endpoint: &str) -> Result<Vec<Song>, FetchError> {
        let url = join(endpoint, "/api/songs");
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        Ok(resp.json().await?)
    }

    async fn fetch_song(&self, endpoint: &str, id: SongId) -> Result<Song, FetchError> {
        let url = join(endpoint, &format!("/api/song/{id}"));
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        Ok(resp.json().await?)
    }
}
