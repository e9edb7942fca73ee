//! # onionscout probe
//!
//! Reachability probing for onionscout.
//!
//! A [`Checker`] decides whether a single endpoint is reachable (plain TCP
//! connect, or TCP plus a TLS handshake). The [`Scanner`] runs a bounded pool
//! of probes over the candidate list and stops as soon as enough relays have
//! answered.
//!
//! ## Example
//!
//! ```rust,no_run
//! use onionscout_probe::{ConnectChecker, ScanConfig, Scanner};
//! # use onionscout_directory::Candidate;
//!
//! # async fn example(candidates: Vec<Candidate>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScanConfig::default();
//! let checker = ConnectChecker::from_config(&config)?;
//! let scanner = Scanner::new(checker, config)?;
//!
//! let summary = scanner.run(candidates).await;
//! for report in &summary.working {
//!     for line in report.bridge_lines() {
//!         println!("{line}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checker;
pub mod error;
pub mod scanner;

pub use checker::{
    Checker, ConnectChecker, ProbeMode, ProbeOutcome, ProbeReport, ReachableAddress, TcpChecker,
    TlsChecker, probe_candidate,
};
pub use error::ProbeError;
pub use scanner::{ScanConfig, ScanObserver, ScanSummary, Scanner};

/// Default number of probes in flight
pub const DEFAULT_CONCURRENCY: usize = 30;

/// Default number of reachable relays to look for
pub const DEFAULT_GOAL: usize = 5;

/// Default per-attempt connect timeout (10 seconds)
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
