//! On-disk copy of the last downloaded directory.
//!
//! Used only when every directory source fails, so a user who managed one
//! download can keep scanning from a network where all sources are blocked.

use crate::error::DirectoryError;
use crate::fetch::{Directory, FetchOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Default maximum cache age (7 days)
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);

/// Directory cache file
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    path: PathBuf,
    max_age: Duration,
}

impl DirectoryCache {
    /// Create a cache stored at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
        }
    }

    /// Default cache location (`<cache dir>/onionscout/relays.json`)
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("onionscout/relays.json")
    }

    /// Cache file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save a downloaded document as received.
    ///
    /// A document without relays is not stored, so it never replaces a
    /// usable copy. Returns whether the cache was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn store(&self, outcome: &FetchOutcome) -> Result<bool, DirectoryError> {
        if outcome.directory.relays.is_empty() {
            tracing::debug!("Not caching an empty relay list");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &outcome.raw)?;

        tracing::debug!(
            "Cached {} relays at {}",
            outcome.directory.relays.len(),
            self.path.display()
        );
        Ok(true)
    }

    /// Age of the cached copy, `None` if there is none
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub fn age(&self) -> Result<Option<Duration>, DirectoryError> {
        match fs::metadata(&self.path) {
            Ok(metadata) => {
                let modified = metadata.modified()?;
                Ok(Some(
                    SystemTime::now()
                        .duration_since(modified)
                        .unwrap_or(Duration::ZERO),
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the cached directory if it exists and is fresh enough
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Directory>, DirectoryError> {
        let Some(age) = self.age()? else {
            return Ok(None);
        };

        if age > self.max_age {
            tracing::debug!(
                "Ignoring stale relay cache ({}s old, limit {}s)",
                age.as_secs(),
                self.max_age.as_secs()
            );
            return Ok(None);
        }

        let contents = fs::read(&self.path)?;
        Ok(Some(serde_json::from_slice(&contents)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{"version":"8.0","relays_published":"2024-01-01 00:00:00","relays":[{"fingerprint":"AAAA","or_addresses":["192.0.2.1:443"],"country":"de"}],"bridges":[]}"#;

    fn outcome(body: &str) -> FetchOutcome {
        FetchOutcome {
            directory: serde_json::from_str(body).unwrap(),
            raw: body.as_bytes().to_vec(),
            source: "https://mirror.example.org/relays.json".to_string(),
        }
    }

    fn cache_in(dir: &Path, max_age: Duration) -> DirectoryCache {
        DirectoryCache::new(dir.join("nested/relays.json"), max_age)
    }

    #[test]
    fn test_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), DEFAULT_CACHE_MAX_AGE);

        assert!(cache.age().unwrap().is_none());
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), DEFAULT_CACHE_MAX_AGE);

        assert!(cache.store(&outcome(DOCUMENT)).unwrap());
        let loaded = cache.load().unwrap().unwrap();

        assert_eq!(loaded.relays, outcome(DOCUMENT).directory.relays);
        assert_eq!(loaded.relays_published.as_deref(), Some("2024-01-01 00:00:00"));
    }

    #[test]
    fn test_document_stored_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), DEFAULT_CACHE_MAX_AGE);

        cache.store(&outcome(DOCUMENT)).unwrap();
        assert_eq!(fs::read_to_string(cache.path()).unwrap(), DOCUMENT);
    }

    #[test]
    fn test_empty_directory_keeps_previous_copy() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), DEFAULT_CACHE_MAX_AGE);

        cache.store(&outcome(DOCUMENT)).unwrap();
        assert!(!cache.store(&outcome(r#"{"relays":[]}"#)).unwrap());

        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded.relays.len(), 1);
    }

    #[test]
    fn test_stale_cache_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(dir.path(), Duration::ZERO);

        cache.store(&outcome(DOCUMENT)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cache_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relays.json");
        fs::write(&path, b"not json").unwrap();

        let cache = DirectoryCache::new(path, DEFAULT_CACHE_MAX_AGE);
        assert!(matches!(cache.load(), Err(DirectoryError::Json(_))));
    }
}
