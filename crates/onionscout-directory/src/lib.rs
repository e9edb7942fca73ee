//! # onionscout directory
//!
//! Relay directory layer for onionscout.
//!
//! This crate provides:
//! - Download of the Onionoo relay directory, with mirror fallback and proxy support
//! - Parsing of relay entries into typed OR endpoints
//! - Candidate list construction (shuffle, country preference, port filter)
//! - An on-disk cache of the last downloaded directory
//!
//! ## Example
//!
//! ```rust,no_run
//! use onionscout_directory::{CandidateBuilder, DirectoryClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DirectoryClient::builder(Duration::from_secs(10)).build()?;
//! let outcome = client.fetch(&[]).await?;
//!
//! let candidates = CandidateBuilder::new()
//!     .preferred_countries(["se", "nl"])
//!     .ports([443])
//!     .build(outcome.directory.into_relays(), &mut rand::thread_rng())?;
//! println!("{} candidates", candidates.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod candidates;
pub mod error;
pub mod fetch;
pub mod relay;

pub use cache::DirectoryCache;
pub use candidates::{Candidate, CandidateBuilder, UNLISTED_COUNTRY_PRIORITY};
pub use error::DirectoryError;
pub use fetch::{Directory, DirectoryClient, DirectoryClientBuilder, FetchOutcome, RawRelay};
pub use relay::{Relay, bridge_line, format_endpoint, parse_or_address};
