// Centralized error handling for the poller

use thiserror::Error;

/// Errors raised by the torrent client gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to reach torrent client: {0}")]
    Network(String),

    #[error("Torrent client request timed out")]
    Timeout,

    #[error("Torrent client rejected credentials: {0}")]
    AuthRejected(String),

    #[error("Torrent client session expired")]
    AuthExpired,

    #[error("Torrent client returned error status: {0}")]
    Status(u16),

    #[error("Failed to decode torrent client response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether dropping the session and logging in again may fix the error
    pub fn is_auth_expiry(&self) -> bool {
        matches!(self, GatewayError::AuthExpired)
    }
}

/// A gateway response that breaks snapshot invariants
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Duplicate torrent id in one snapshot: {0}")]
    DuplicateId(String),
}

/// Everything that can make a poll produce no snapshot
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Malformed snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),

    #[error("Fetch timed out after {0}s")]
    Timeout(u64),
}

/// Errors raised while delivering a report
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to reach notification endpoint: {0}")]
    Network(String),

    #[error("Delivery timed out after {0}s")]
    Timeout(u64),

    #[error("Notification endpoint rejected payload: status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Fatal configuration problems, only raised at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
