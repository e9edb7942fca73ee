//! One scan run: directory, candidates, probes.
//!
//! The binary only renders what [`run_scan`] returns; everything that
//! decides the exit status lives here.

use crate::config::Config;
use crate::progress::format_duration;
use onionscout_directory::{
    CandidateBuilder, Directory, DirectoryCache, DirectoryClient, DirectoryError,
};
use onionscout_probe::{ConnectChecker, ScanObserver, ScanSummary, Scanner};

/// Exit status when the relay directory can't be obtained
pub const EXIT_NO_DIRECTORY: u8 = 1;

/// Exit status when no relay listens on the requested ports
pub const EXIT_NO_MATCHING_PORTS: u8 = 2;

/// How a scan run ended
#[derive(Debug)]
pub enum ScanOutcome {
    /// Every candidate was probed or the goal was reached; may be empty
    Completed(ScanSummary),
    /// No source answered and no usable cached copy exists
    NoDirectory,
    /// The port filter matched no endpoint
    NoMatchingPorts(Vec<u16>),
}

impl ScanOutcome {
    /// Process exit status for this outcome
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Completed(_) => 0,
            Self::NoDirectory => EXIT_NO_DIRECTORY,
            Self::NoMatchingPorts(_) => EXIT_NO_MATCHING_PORTS,
        }
    }
}

/// Download the relay directory, falling back to `cache`.
///
/// A successful download refreshes the cache. Cache failures are logged and
/// never fatal. Returns `None` if neither a source nor the cache has a
/// directory.
pub async fn load_directory(
    client: &DirectoryClient,
    preferred: &[String],
    cache: Option<&DirectoryCache>,
) -> Option<Directory> {
    tracing::info!("Downloading Tor relay information from Tor Metrics...");

    let error = match client.fetch(preferred).await {
        Ok(outcome) => {
            if let Some(published) = &outcome.directory.relays_published {
                tracing::debug!("Relay list published {}", published);
            }
            if let Some(cache) = cache {
                if let Err(e) = cache.store(&outcome) {
                    tracing::warn!("Can't update relay cache {}: {}", cache.path().display(), e);
                }
            }
            return Some(outcome.directory);
        }
        Err(e) => e,
    };

    let cache = cache?;
    match cache.load() {
        Ok(Some(directory)) => {
            let age = cache.age().ok().flatten().unwrap_or_default();
            tracing::warn!(
                "{}; using cached relay list ({} old)",
                error,
                format_duration(age)
            );
            Some(directory)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Can't read relay cache {}: {}", cache.path().display(), e);
            None
        }
    }
}

/// Run a full scan with `config`, downloading through `client`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the prober can't be
/// set up. Missing directories and unmatched ports are outcomes, not errors.
pub async fn run_scan<O>(
    config: &Config,
    client: &DirectoryClient,
    observer: &mut O,
) -> anyhow::Result<ScanOutcome>
where
    O: ScanObserver + ?Sized,
{
    let scan_config = config.scan_config()?;
    tracing::info!(
        "Tor relay scanner. Will scan up to {} working relays (or until the end)",
        scan_config.goal
    );

    let cache = config.directory_cache();
    let relays = load_directory(client, &config.directory.urls, cache.as_ref())
        .await
        .map(Directory::into_relays)
        .unwrap_or_default();
    if relays.is_empty() {
        tracing::error!("Tor relay information can't be downloaded!");
        return Ok(ScanOutcome::NoDirectory);
    }

    let candidates = match CandidateBuilder::new()
        .preferred_countries(&config.scan.preferred_countries)
        .ports(config.scan.ports.iter().copied())
        .build(relays, &mut rand::thread_rng())
    {
        Ok(candidates) => candidates,
        Err(DirectoryError::NoRelaysOnPorts { ports }) => {
            tracing::error!(
                "There are no relays within specified port number constraints {:?}!",
                ports
            );
            tracing::error!("Try changing port numbers.");
            return Ok(ScanOutcome::NoMatchingPorts(ports));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Testing {} candidates, {} at a time ({} mode, {}s timeout)",
        candidates.len(),
        scan_config.concurrency,
        scan_config.mode,
        scan_config.timeout.as_secs_f64()
    );

    let checker = ConnectChecker::from_config(&scan_config)?;
    let scanner = Scanner::new(checker, scan_config)?;
    Ok(ScanOutcome::Completed(
        scanner.run_with(candidates, observer).await,
    ))
}
