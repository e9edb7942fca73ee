//! Error types for the probing layer.

use thiserror::Error;

/// Probe setup errors
///
/// Individual probe failures are not errors; they are reported as
/// [`crate::ProbeOutcome`] values.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Scan parameters out of range
    #[error("invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// TLS client could not be configured
    #[error("tls setup failed: {0}")]
    Tls(#[from] rustls::Error),

    /// Unknown probe mode name
    #[error("unknown probe mode '{0}' (expected 'tcp' or 'tls')")]
    UnknownMode(String),
}
