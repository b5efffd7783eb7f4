//! Repository resolver
//!
//! Turns a pinned [`HookSource`] into a [`ResolvedRepo`]: a local checkout of
//! the repository at its revision plus the hooks it declares. Checkouts are
//! content addressed by [`cache_key`] and verified on every reuse against the
//! checksum of the files recorded at fetch time.
//!
//! Resolution is idempotent: within one resolver the result is memoized,
//! across runs the cache index is consulted, and only a miss reaches the
//! [`RepoFetcher`].

pub mod cache;
pub mod definition;
pub mod fetcher;

pub use cache::{CacheEntry, RepoCache};
pub use definition::{HOOKS_FILE, HookDefinition, load_definitions};
pub use fetcher::{RepoFetcher, RetryPolicy};

use crate::checksum::{cache_key, fetched_files, tree_checksum};
use indexmap::IndexMap;
use pinhook_config::{HookSource, Manifest};
use pinhook_core::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use subtle::ConstantTimeEq;

/// A hook repository checked out at its pinned revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepo {
    /// Repository URL
    pub url: String,
    /// Pinned revision
    pub rev: String,
    /// Checkout directory
    pub path: PathBuf,
    /// Tree checksum of the checkout (hex)
    pub checksum: String,
    /// Hooks declared by the repository, in declaration order
    pub hooks: IndexMap<String, HookDefinition>,
    /// Whether the checkout came from the cache rather than a fetch
    pub from_cache: bool,
}

impl ResolvedRepo {
    /// Definition of a hook provided by this repository
    pub fn definition(&self, hook_id: &str) -> Result<&HookDefinition> {
        self.hooks.get(hook_id).ok_or_else(|| Error::HookNotFound {
            url: self.url.clone(),
            rev: self.rev.clone(),
            hook_id: hook_id.to_string(),
        })
    }
}

/// Cache keys of every remote source referenced by a manifest
#[must_use]
pub fn referenced_keys(manifest: &Manifest) -> HashSet<String> {
    manifest
        .remote_sources()
        .map(|(url, rev)| cache_key(url, rev))
        .collect()
}

/// Resolves pinned hook sources through a [`RepoCache`]
pub struct Resolver<'a> {
    cache: &'a RepoCache,
    fetcher: Box<dyn RepoFetcher + 'a>,
    retry: RetryPolicy,
    memo: Mutex<HashMap<String, Arc<ResolvedRepo>>>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    fetches: AtomicUsize,
}

impl<'a> Resolver<'a> {
    /// Create a resolver with the default retry policy
    pub fn new(cache: &'a RepoCache, fetcher: impl RepoFetcher + 'a) -> Self {
        Self {
            cache,
            fetcher: Box::new(fetcher),
            retry: RetryPolicy::default(),
            memo: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The cache this resolver reads and fills
    #[must_use]
    pub fn cache(&self) -> &RepoCache {
        self.cache
    }

    /// Number of fetch attempts made so far (retries included)
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Resolve a manifest source
    pub fn resolve(&self, source: &HookSource) -> Result<Arc<ResolvedRepo>> {
        if source.is_local() {
            return Err(Error::Message(
                "local hook sources live in the project and are never resolved".to_string(),
            ));
        }
        self.resolve_pinned(&source.repo, &source.rev)
    }

    /// Resolve `url` at `rev`
    ///
    /// Concurrent callers asking for the same pair wait for a single fetch.
    #[tracing::instrument(skip(self), fields(from_cache = tracing::field::Empty))]
    pub fn resolve_pinned(&self, url: &str, rev: &str) -> Result<Arc<ResolvedRepo>> {
        let key = cache_key(url, rev);

        if let Some(hit) = self.memoized(&key) {
            tracing::debug!("Resolved from in-memory memo");
            return Ok(hit);
        }

        let gate = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(inflight.entry(key.clone()).or_default())
        };
        let _guard = gate.lock().unwrap_or_else(PoisonError::into_inner);

        // Another thread may have finished while we waited
        if let Some(hit) = self.memoized(&key) {
            return Ok(hit);
        }

        let resolved = self.resolve_uncached(&key, url, rev);
        if let Ok(repo) = &resolved {
            tracing::Span::current().record("from_cache", repo.from_cache);
            self.memo
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.clone(), Arc::clone(repo));
        }

        // Waiters still hold their clone of the gate; later callers hit the memo
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        resolved
    }

    fn resolve_uncached(&self, key: &str, url: &str, rev: &str) -> Result<Arc<ResolvedRepo>> {
        let repo = match self.from_index(key, url, rev)? {
            Some(repo) => repo,
            None => self.fetch_into_cache(key, url, rev)?,
        };
        Ok(Arc::new(repo))
    }

    fn memoized(&self, key: &str) -> Option<Arc<ResolvedRepo>> {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Reuse a checkout recorded in the index, verifying its checksum
    fn from_index(&self, key: &str, url: &str, rev: &str) -> Result<Option<ResolvedRepo>> {
        let Some(entry) = self.cache.lookup(key)? else {
            return Ok(None);
        };

        if !entry.checkout().is_dir() {
            tracing::warn!(url, rev, path = %entry.path, "Cached checkout disappeared, refetching");
            self.cache.forget(key)?;
            return Ok(None);
        }

        let actual = tree_checksum(entry.checkout(), &entry.files)?;
        if !bool::from(entry.checksum.as_bytes().ct_eq(actual.as_bytes())) {
            return Err(Error::ChecksumMismatch {
                url: url.to_string(),
                rev: rev.to_string(),
                expected: entry.checksum,
                actual,
            });
        }

        let hooks = load_definitions(entry.checkout(), url, rev)?;
        tracing::debug!(url, rev, "Cache hit");

        Ok(Some(ResolvedRepo {
            url: url.to_string(),
            rev: rev.to_string(),
            path: PathBuf::from(entry.path),
            checksum: actual,
            hooks,
            from_cache: true,
        }))
    }

    /// Fetch into a scratch directory, then move it into place and record it
    fn fetch_into_cache(&self, key: &str, url: &str, rev: &str) -> Result<ResolvedRepo> {
        let target = self.cache.checkout_path(key);
        if target.exists() {
            tracing::debug!(path = %target.display(), "Removing unrecorded checkout");
            fs::remove_dir_all(&target)?;
        }

        let label = format!("{url}@{rev}");
        let scratch = self.retry.run(&label, |attempt| {
            self.fetches.fetch_add(1, Ordering::Relaxed);
            tracing::info!(url, rev, attempt = attempt + 1, "Fetching hook repository");
            let scratch = tempfile::Builder::new()
                .prefix(".fetch-")
                .tempdir_in(self.cache.repos_dir())?;
            self.fetcher.fetch(url, rev, scratch.path())?;
            Ok(scratch)
        })?;

        let files = fetched_files(scratch.path())?;
        let checksum = tree_checksum(scratch.path(), &files)?;
        let hooks = load_definitions(scratch.path(), url, rev)?;

        let staged = scratch.keep();
        if let Err(e) = fs::rename(&staged, &target) {
            let _ = fs::remove_dir_all(&staged);
            return Err(e.into());
        }

        let entry = CacheEntry {
            key: key.to_string(),
            url: url.to_string(),
            rev: rev.to_string(),
            path: target.to_string_lossy().into_owned(),
            checksum: checksum.clone(),
            files,
            fetched_at: chrono::Utc::now().timestamp(),
        };
        self.cache.record(&entry)?;

        tracing::debug!(url, rev, checksum = %checksum, "Recorded checkout");

        Ok(ResolvedRepo {
            url: url.to_string(),
            rev: rev.to_string(),
            path: target,
            checksum,
            hooks,
            from_cache: false,
        })
    }
}
