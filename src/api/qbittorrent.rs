use crate::api::gateway::{ClientGateway, Session};
use crate::core::error::GatewayError;
use crate::models::torrent::{TorrentRecord, TorrentState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Gateway for the qBittorrent Web API (v2).
///
/// The `SID` cookie set by a login lives in the client's cookie store and is
/// replayed on every later request.
pub struct QbitClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    logins: AtomicU64,
}

/// One entry of `/api/v2/torrents/info`
#[derive(Debug, Deserialize)]
pub struct QbitTorrent {
    pub hash: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub downloaded: u64,
    #[serde(default)]
    pub uploaded: u64,
    #[serde(default)]
    pub dlspeed: u64,
    #[serde(default)]
    pub upspeed: u64,
    pub state: String,
}

impl From<QbitTorrent> for TorrentRecord {
    fn from(torrent: QbitTorrent) -> Self {
        TorrentRecord::new(torrent.hash, torrent.name, TorrentState::parse(&torrent.state))
            .with_size(torrent.size)
            .with_totals(torrent.downloaded, torrent.uploaded)
            .with_speeds(torrent.dlspeed, torrent.upspeed)
    }
}

impl QbitClient {
    pub fn new(base_url: &str, username: String, password: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            logins: AtomicU64::new(0),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ClientGateway for QbitClient {
    /// Log in; the session cookie lands in the client's cookie store
    async fn authenticate(&self) -> Result<Session, GatewayError> {
        let response = self
            .client
            .post(self.url("/api/v2/auth/login"))
            .header(REFERER, self.base_url.as_str())
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(GatewayError::AuthRejected(
                "client refused login (too many failed attempts)".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(request_error)?;
        if body.trim() != "Ok." {
            return Err(GatewayError::AuthRejected(body.trim().to_string()));
        }

        let login = self.logins.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(login, "Authenticated with torrent client");

        Ok(Session::new(login))
    }

    async fn list_torrents(&self, _session: &Session) -> Result<Vec<TorrentRecord>, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/v2/torrents/info"))
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(GatewayError::AuthExpired);
        }
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let torrents = response
            .json::<Vec<QbitTorrent>>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(torrents.into_iter().map(TorrentRecord::from).collect())
    }
}

fn request_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Network(err.to_string())
    }
}
