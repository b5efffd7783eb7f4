//! Fetching hook repositories
//!
//! [`RepoFetcher`] is the seam between the resolver and the network. The
//! production implementation is [`crate::git::GitFetcher`]; tests plug in
//! fetchers that write fixture trees or fail on demand.

use pinhook_config::ResolverSettings;
use pinhook_core::Result;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Something that can materialize a repository at a revision
pub trait RepoFetcher: Send + Sync {
    /// Write the tree of `url` at `rev` into `dest`
    ///
    /// `dest` exists and is empty. Transient failures must be reported as
    /// [`pinhook_core::Error::NetworkError`] so they are retried; a revision
    /// that does not exist is [`pinhook_core::Error::RevisionNotFound`].
    fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<()>;
}

impl<F> RepoFetcher for F
where
    F: Fn(&str, &str, &Path) -> Result<()> + Send + Sync,
{
    fn fetch(&self, url: &str, rev: &str, dest: &Path) -> Result<()> {
        self(url, rev, dest)
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub retries: u32,
    /// Delay before the first retry
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&ResolverSettings::default())
    }
}

impl RetryPolicy {
    /// Policy with explicit values
    #[must_use]
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// Policy from the `[resolver]` settings section
    #[must_use]
    pub fn from_settings(settings: &ResolverSettings) -> Self {
        Self::new(settings.retries, Duration::from_millis(settings.backoff_ms))
    }

    /// Single attempt, no retries
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based): `backoff * 2^attempt`
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent
    ///
    /// `op` receives the 0-based attempt number.
    pub fn run<T>(&self, label: &str, mut op: impl FnMut(u32) -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    let delay = self.delay(attempt);
                    tracing::warn!(
                        source = label,
                        attempt = attempt + 1,
                        retries = self.retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
