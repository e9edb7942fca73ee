//! Bounded worker pool over the candidate list.
//!
//! At most `concurrency` candidates are probed at once. Each finished probe
//! frees a slot for the next candidate. Reachable relays are collected in
//! completion order; once `goal` of them are found the remaining probes are
//! aborted and nothing new is started.

use crate::checker::{Checker, ProbeMode, ProbeReport, probe_candidate};
use crate::error::ProbeError;
use crate::{DEFAULT_CONCURRENCY, DEFAULT_GOAL, DEFAULT_TIMEOUT};
use onionscout_directory::Candidate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Upper bound on probes in flight (open sockets)
pub const MAX_CONCURRENCY: usize = 4096;

/// Scan parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Probes in flight
    pub concurrency: usize,
    /// Reachable relays to find before stopping
    pub goal: usize,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Probe mode
    pub mode: ProbeMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            goal: DEFAULT_GOAL,
            timeout: DEFAULT_TIMEOUT,
            mode: ProbeMode::Tcp,
        }
    }
}

impl ScanConfig {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidConfig`] for zero concurrency, zero goal,
    /// zero timeout or concurrency above [`MAX_CONCURRENCY`].
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ProbeError::InvalidConfig(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            )));
        }
        if self.goal == 0 {
            return Err(ProbeError::InvalidConfig(
                "goal must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProbeError::InvalidConfig(
                "timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scan progress callbacks
#[allow(unused_variables)]
pub trait ScanObserver {
    /// Called once before the first probe starts
    fn on_started(&mut self, total: usize, config: &ScanConfig) {}

    /// Called for every finished probe, reachable or not
    fn on_probed(&mut self, report: &ProbeReport, found: usize) {}

    /// Called once with the final summary
    fn on_finished(&mut self, summary: &ScanSummary) {}
}

impl ScanObserver for () {}

/// Outcome of a scan
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Reachable relays, in the order they answered (at most `goal`)
    pub working: Vec<ProbeReport>,
    /// Candidates whose probe finished
    pub tested: usize,
    /// Candidates available
    pub total: usize,
    /// Wall time of the scan
    pub elapsed: Duration,
    /// Whether the goal was met
    pub goal_reached: bool,
}

impl ScanSummary {
    /// Bridge lines of every reachable endpoint, in result order
    #[must_use]
    pub fn bridge_lines(&self) -> Vec<String> {
        self.working.iter().flat_map(ProbeReport::bridge_lines).collect()
    }
}

/// Bounded-concurrency relay scanner
pub struct Scanner<C> {
    checker: Arc<C>,
    config: ScanConfig,
}

impl<C: Checker + 'static> Scanner<C> {
    /// Create a scanner
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is out of range.
    pub fn new(checker: C, config: ScanConfig) -> Result<Self, ProbeError> {
        config.validate()?;
        Ok(Self {
            checker: Arc::new(checker),
            config,
        })
    }

    /// Probe candidates until `goal` relays answer or the list runs out
    pub async fn run(&self, candidates: Vec<Candidate>) -> ScanSummary {
        self.run_with(candidates, &mut ()).await
    }

    /// Like [`Scanner::run`], reporting progress to `observer`
    pub async fn run_with<O>(&self, candidates: Vec<Candidate>, observer: &mut O) -> ScanSummary
    where
        O: ScanObserver + ?Sized,
    {
        let started = Instant::now();
        let total = candidates.len();
        let goal = self.config.goal;

        observer.on_started(total, &self.config);
        tracing::debug!(
            "Scanning {} candidates ({} at a time, goal {}, {} mode)",
            total,
            self.config.concurrency,
            goal,
            self.config.mode
        );

        let mut pending = candidates.into_iter();
        let mut in_flight = JoinSet::new();
        let mut working = Vec::new();
        let mut tested = 0;

        for candidate in pending.by_ref().take(self.config.concurrency) {
            self.spawn_probe(&mut in_flight, candidate);
        }

        while let Some(joined) = in_flight.join_next().await {
            tested += 1;

            match joined {
                Ok(report) => {
                    let found = working.len() + usize::from(report.is_reachable());
                    observer.on_probed(&report, found);
                    if report.is_reachable() {
                        working.push(report);
                    }

                    if working.len() >= goal {
                        tracing::debug!(
                            "Goal of {} reached, aborting {} probes",
                            goal,
                            in_flight.len()
                        );
                        in_flight.abort_all();
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Probe task failed: {}", e);
                }
            }

            if let Some(candidate) = pending.next() {
                self.spawn_probe(&mut in_flight, candidate);
            }
        }

        let summary = ScanSummary {
            goal_reached: working.len() >= goal,
            working,
            tested,
            total,
            elapsed: started.elapsed(),
        };
        observer.on_finished(&summary);
        summary
    }

    fn spawn_probe(&self, in_flight: &mut JoinSet<ProbeReport>, candidate: Candidate) {
        let checker = Arc::clone(&self.checker);
        in_flight.spawn(async move { probe_candidate(checker.as_ref(), candidate).await });
    }
}
