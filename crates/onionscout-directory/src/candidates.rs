//! Candidate list construction.
//!
//! Relays are shuffled so every run samples a different part of the
//! directory, then optionally ranked by preferred country and restricted to a
//! set of OR ports.

use crate::error::DirectoryError;
use crate::relay::Relay;
use rand::Rng;
use rand::seq::SliceRandom;
use std::net::SocketAddr;

/// Rank given to relays whose country is not in the preference list
pub const UNLISTED_COUNTRY_PRIORITY: usize = 1000;

/// One unit of probing work: a relay and the endpoints to try
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Relay fingerprint
    pub fingerprint: String,
    /// Endpoints to probe, in order
    pub addresses: Vec<SocketAddr>,
    /// Relay country code
    pub country: Option<String>,
}

impl From<Relay> for Candidate {
    fn from(relay: Relay) -> Self {
        Self {
            fingerprint: relay.fingerprint,
            addresses: relay.or_addresses,
            country: relay.country,
        }
    }
}

/// Builds the shuffled, filtered candidate list
#[derive(Debug, Clone, Default)]
pub struct CandidateBuilder {
    preferred_countries: Vec<String>,
    ports: Vec<u16>,
}

impl CandidateBuilder {
    /// Create a builder with no country preference and no port filter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank relays from these countries first, in the given order
    #[must_use]
    pub fn preferred_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.preferred_countries = countries
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    /// Only keep endpoints listening on one of these ports
    #[must_use]
    pub fn ports<I: IntoIterator<Item = u16>>(mut self, ports: I) -> Self {
        self.ports = ports.into_iter().collect();
        self
    }

    /// Split a comma-separated country list (`se,gb,nl`)
    #[must_use]
    pub fn parse_country_list(list: &str) -> Vec<String> {
        list.split(',')
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Priority of a country, lower is tried first.
    ///
    /// A country listed twice keeps its first rank.
    #[must_use]
    pub fn country_priority(&self, country: Option<&str>) -> usize {
        country
            .and_then(|c| {
                self.preferred_countries
                    .iter()
                    .position(|p| p.eq_ignore_ascii_case(c))
            })
            .unwrap_or(UNLISTED_COUNTRY_PRIORITY)
    }

    /// Shuffle, rank and filter relays into candidates.
    ///
    /// With a port filter every matching endpoint becomes its own
    /// single-address candidate. Relays left without endpoints are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NoRelaysOnPorts`] if a port filter is set
    /// and no endpoint matches it.
    pub fn build<R: Rng + ?Sized>(
        &self,
        mut relays: Vec<Relay>,
        rng: &mut R,
    ) -> Result<Vec<Candidate>, DirectoryError> {
        relays.shuffle(rng);

        if !self.preferred_countries.is_empty() {
            // Stable sort keeps the shuffled order within each rank
            relays.sort_by_cached_key(|relay| self.country_priority(relay.country.as_deref()));
        }

        if self.ports.is_empty() {
            return Ok(relays
                .into_iter()
                .filter(|relay| !relay.or_addresses.is_empty())
                .map(Candidate::from)
                .collect());
        }

        let candidates: Vec<Candidate> = relays
            .into_iter()
            .flat_map(|relay| {
                let Relay {
                    fingerprint,
                    or_addresses,
                    country,
                } = relay;
                or_addresses
                    .into_iter()
                    .filter(|addr| self.ports.contains(&addr.port()))
                    .map(move |addr| Candidate {
                        fingerprint: fingerprint.clone(),
                        addresses: vec![addr],
                        country: country.clone(),
                    })
            })
            .collect();

        if candidates.is_empty() {
            return Err(DirectoryError::NoRelaysOnPorts {
                ports: self.ports.clone(),
            });
        }

        tracing::debug!(
            "{} endpoints match ports {:?}",
            candidates.len(),
            self.ports
        );

        Ok(candidates)
    }
}
