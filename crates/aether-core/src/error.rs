use serde::{Deserialize, Serialize};

/// Error taxonomy for Aether. Every variant corresponds to one row of the
/// error-handling design: transient kinds are retried by the fetcher,
/// everything else bubbles to the caller with the originating message
/// folded in (never silently discarded).
#[derive(thiserror::Error, Debug, Clone, Serialize, Deserialize)]
pub enum Error {
    #[error("operation cancelled")]
    Cancelled,

    #[error("request timed out")]
    Timeout,

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("too many redirects (max {0})")]
    TooManyRedirects(usize),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("http status {0}")]
    HttpStatus(u16),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("robots.txt disallows fetching {0}")]
    RobotsDisallowed(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("search source {source} failed: {cause}")]
    Source { source: String, cause: String },

    #[error("transform plugin {name} failed: {cause}")]
    Transform { name: String, cause: String },

    #[error("no display plugin registered for format {0:?}")]
    PluginNotFound(String),

    #[error("plugin conflict: {0}")]
    PluginConflict(String),

    #[error("BT0N data is corrupt: {0}")]
    BtonCorrupt(String),

    #[error("BT0N version mismatch: expected {expected}, found {found}")]
    BtonVersion { expected: u8, found: u8 },

    #[error("BT0N unknown token kind: {0}")]
    BtonUnknownKind(u8),

    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Transient kinds the fetcher's retry loop considers worth another attempt:
    /// transport failures, timeouts, connection refusal, and 5xx other than 501.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout | Error::ConnectionRefused(_) => true,
            Error::HttpStatus(code) => *code >= 500 && *code != 501,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
