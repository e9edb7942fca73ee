//! Error types for the relay directory layer.

use thiserror::Error;

/// Directory download and candidate selection errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// HTTP request failed (connect, TLS, timeout or non-success status)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not a valid directory document
    #[error("invalid directory document: {0}")]
    Json(#[from] serde_json::Error),

    /// Proxy URL rejected by the HTTP client
    #[error("invalid proxy url '{url}': {source}")]
    InvalidProxy {
        /// Proxy URL as given
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// OR address could not be parsed as `ip:port`
    #[error("invalid OR address: {0}")]
    InvalidAddress(String),

    /// Every directory source failed
    #[error("all {attempted} directory sources failed")]
    AllSourcesFailed {
        /// Number of sources tried
        attempted: usize,
    },

    /// Port filter removed every relay
    #[error("no relays listen on ports {ports:?}")]
    NoRelaysOnPorts {
        /// Requested ports
        ports: Vec<u16>,
    },

    /// Cache file I/O failed
    #[error("cache error: {0}")]
    Cache(#[from] std::io::Error),
}
