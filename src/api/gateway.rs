use crate::core::error::GatewayError;
use crate::models::torrent::TorrentRecord;
use async_trait::async_trait;

/// Marks a successful login with the torrent client.
///
/// The credential itself (a cookie for qBittorrent) stays inside the
/// gateway's HTTP client; `login` counts logins so a renewal is observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    pub login: u64,
}

impl Session {
    pub fn new(login: u64) -> Self {
        Self { login }
    }
}

/// Access to the torrent client.
///
/// Credentials are held by the implementation. `list_torrents` reports
/// `GatewayError::AuthExpired` when the session needs to be renewed.
#[async_trait]
pub trait ClientGateway: Send + Sync {
    async fn authenticate(&self) -> Result<Session, GatewayError>;

    async fn list_torrents(&self, session: &Session) -> Result<Vec<TorrentRecord>, GatewayError>;
}
