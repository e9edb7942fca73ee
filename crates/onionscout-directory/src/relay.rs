//! Typed relay entries and OR endpoint helpers.

use crate::error::DirectoryError;
use crate::fetch::RawRelay;
use std::net::SocketAddr;

/// A running relay with its parsed OR endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    /// Hex relay fingerprint
    pub fingerprint: String,
    /// OR endpoints (IPv4 and IPv6)
    pub or_addresses: Vec<SocketAddr>,
    /// Lowercase two-letter country code, if known
    pub country: Option<String>,
}

impl Relay {
    /// Build a relay from a raw directory entry.
    ///
    /// Returns `None` for entries without a fingerprint. Unparseable OR
    /// addresses are skipped.
    #[must_use]
    pub fn from_raw(raw: RawRelay) -> Option<Self> {
        let fingerprint = raw.fingerprint.filter(|f| !f.is_empty())?;

        let or_addresses = raw
            .or_addresses
            .iter()
            .filter_map(|address| match parse_or_address(address) {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::debug!("Skipping address of relay {}: {}", fingerprint, e);
                    None
                }
            })
            .collect();

        Some(Self {
            fingerprint,
            or_addresses,
            country: raw.country.map(|c| c.to_ascii_lowercase()),
        })
    }
}

/// Parse an Onionoo OR address (`1.2.3.4:9001` or `[2001:db8::1]:443`)
///
/// # Errors
///
/// Returns [`DirectoryError::InvalidAddress`] if the string is not an
/// `ip:port` pair.
pub fn parse_or_address(address: &str) -> Result<SocketAddr, DirectoryError> {
    address
        .trim()
        .parse()
        .map_err(|_| DirectoryError::InvalidAddress(address.to_string()))
}

/// Format an endpoint the way Tor expects it in bridge lines
///
/// # Example
///
/// ```
/// use onionscout_directory::format_endpoint;
///
/// assert_eq!(format_endpoint("1.2.3.4:9001".parse().unwrap()), "1.2.3.4:9001");
/// assert_eq!(format_endpoint("[2001:db8::1]:443".parse().unwrap()), "[2001:db8::1]:443");
/// ```
#[must_use]
pub fn format_endpoint(addr: SocketAddr) -> String {
    match addr {
        SocketAddr::V4(v4) => format!("{}:{}", v4.ip(), v4.port()),
        SocketAddr::V6(v6) => format!("[{}]:{}", v6.ip(), v6.port()),
    }
}

/// Bridge line for one endpoint: `<endpoint> <FINGERPRINT>`
#[must_use]
pub fn bridge_line(addr: SocketAddr, fingerprint: &str) -> String {
    format!("{} {}", format_endpoint(addr), fingerprint)
}
