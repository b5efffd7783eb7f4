//! On-disk repository cache
//!
//! Layout below the cache root:
//!
//! ```text
//! <root>/index.redb        cache index (bucket `repoCache`)
//! <root>/repos/<key>/      checkout of one (url, rev) pair
//! ```
//!
//! The cache object is created once per run and handed to the resolver;
//! nothing here is global.

use crate::state::{MemoryState, PersistentState, REPO_CACHE_BUCKET, RedbPersistentState};
use pinhook_core::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the index database inside the cache root
pub const INDEX_FILE: &str = "index.redb";

/// Directory holding checkouts inside the cache root
pub const REPOS_DIR: &str = "repos";

/// Index record written when a checkout is fetched
#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct CacheEntry {
    /// Cache key (hex SHA-256 of url and rev)
    pub key: String,
    /// Repository URL
    pub url: String,
    /// Pinned revision as written in the manifest
    pub rev: String,
    /// Checkout directory
    pub path: String,
    /// Tree checksum recorded at fetch time (hex)
    pub checksum: String,
    /// Files present right after the fetch, covered by `checksum`
    pub files: Vec<String>,
    /// Fetch time, seconds since the Unix epoch
    pub fetched_at: i64,
}

impl CacheEntry {
    /// Serialize to bytes for the index using bincode
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::State(format!("Failed to encode cache entry: {e}")))
    }

    /// Deserialize from bytes using bincode
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bincode::decode_from_slice(bytes, bincode::config::standard())
            .ok()
            .map(|(entry, _len)| entry)
    }

    /// Checkout directory as a path
    #[must_use]
    pub fn checkout(&self) -> &Path {
        Path::new(&self.path)
    }
}

/// Repository cache: checkout directories plus their index
pub struct RepoCache {
    root: PathBuf,
    index: Box<dyn PersistentState>,
}

impl std::fmt::Debug for RepoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoCache").field("root", &self.root).finish_non_exhaustive()
    }
}

impl RepoCache {
    /// Open (or create) the cache rooted at `root` with a redb index
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(REPOS_DIR))?;
        let index = RedbPersistentState::new(root.join(INDEX_FILE))?;
        tracing::debug!(root = %root.display(), "Opened repository cache");
        Ok(Self {
            root,
            index: Box::new(index),
        })
    }

    /// Cache rooted at `root` whose index lives only in memory
    pub fn in_memory(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_state(root, Box::new(MemoryState::new()))
    }

    /// Cache rooted at `root` using an arbitrary index backend
    pub fn with_state(root: impl Into<PathBuf>, index: Box<dyn PersistentState>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(REPOS_DIR))?;
        Ok(Self { root, index })
    }

    /// Cache root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every checkout
    #[must_use]
    pub fn repos_dir(&self) -> PathBuf {
        self.root.join(REPOS_DIR)
    }

    /// Checkout directory for a cache key
    #[must_use]
    pub fn checkout_path(&self, key: &str) -> PathBuf {
        self.repos_dir().join(key)
    }

    /// Look up the index record for a key
    ///
    /// Undecodable records are treated as absent.
    pub fn lookup(&self, key: &str) -> Result<Option<CacheEntry>> {
        let bytes = self.index.get(REPO_CACHE_BUCKET, key.as_bytes())?;
        Ok(bytes.and_then(|b| {
            let entry = CacheEntry::from_bytes(&b);
            if entry.is_none() {
                tracing::warn!(key, "Ignoring unreadable cache index record");
            }
            entry
        }))
    }

    /// Write the index record for an entry
    pub fn record(&self, entry: &CacheEntry) -> Result<()> {
        self.index
            .set(REPO_CACHE_BUCKET, entry.key.as_bytes(), &entry.to_bytes()?)
    }

    /// Drop the index record for a key, leaving the checkout alone
    pub fn forget(&self, key: &str) -> Result<()> {
        self.index.delete(REPO_CACHE_BUCKET, key.as_bytes())
    }

    /// Every readable index record
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        self.index.for_each(REPO_CACHE_BUCKET, &mut |_key, value| {
            if let Some(entry) = CacheEntry::from_bytes(value) {
                entries.push(entry);
            }
            Ok(())
        })?;
        entries.sort_by(|a, b| a.url.cmp(&b.url).then_with(|| a.rev.cmp(&b.rev)));
        Ok(entries)
    }

    /// Remove every checkout and the whole index
    ///
    /// Returns the number of checkouts removed.
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    pub fn clean(&self) -> Result<usize> {
        let mut removed = 0;
        for dir in fs::read_dir(self.repos_dir())? {
            let dir = dir?;
            if dir.file_type()?.is_dir() {
                fs::remove_dir_all(dir.path())?;
                removed += 1;
            }
        }
        self.index.delete_bucket(REPO_CACHE_BUCKET)?;
        tracing::info!(removed, "Cleaned repository cache");
        Ok(removed)
    }

    /// Remove every checkout whose key is not in `keep`
    ///
    /// Checkouts without an index record (leftovers of interrupted fetches)
    /// are removed too. Returns the number of checkouts removed.
    #[tracing::instrument(skip(self, keep), fields(keep = keep.len()))]
    pub fn gc(&self, keep: &HashSet<String>) -> Result<usize> {
        for entry in self.entries()? {
            if !keep.contains(&entry.key) {
                tracing::debug!(url = %entry.url, rev = %entry.rev, "Dropping unreferenced cache entry");
                self.forget(&entry.key)?;
            }
        }

        let mut removed = 0;
        for dir in fs::read_dir(self.repos_dir())? {
            let dir = dir?;
            let name = dir.file_name().to_string_lossy().into_owned();
            if !keep.contains(&name) && dir.file_type()?.is_dir() {
                fs::remove_dir_all(dir.path())?;
                removed += 1;
            }
        }

        tracing::info!(removed, "Garbage collected repository cache");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::checksum::cache_key;
    use tempfile::TempDir;

    fn entry(cache: &RepoCache, url: &str, rev: &str) -> CacheEntry {
        let key = cache_key(url, rev);
        let path = cache.checkout_path(&key);
        fs::create_dir_all(&path).unwrap();
        CacheEntry {
            key,
            url: url.to_string(),
            rev: rev.to_string(),
            path: path.to_string_lossy().into_owned(),
            checksum: "00".repeat(32),
            files: vec!["hook.sh".to_string()],
            fetched_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_entry_bytes_round_trip() {
        let temp = TempDir::new().unwrap();
        let cache = RepoCache::in_memory(temp.path()).unwrap();
        let original = entry(&cache, "https://example.com/hooks", "v1");
        let decoded = CacheEntry::from_bytes(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert!(CacheEntry::from_bytes(b"garbage").is_none());
    }

    #[test]
    fn test_record_and_lookup_persist_across_open() {
        let temp = TempDir::new().unwrap();
        let recorded = {
            let cache = RepoCache::open(temp.path()).unwrap();
            let e = entry(&cache, "https://example.com/hooks", "v1");
            cache.record(&e).unwrap();
            e
        };

        let cache = RepoCache::open(temp.path()).unwrap();
        assert_eq!(cache.lookup(&recorded.key).unwrap(), Some(recorded));
        assert_eq!(cache.lookup("missing").unwrap(), None);
    }

    #[test]
    fn test_clean_removes_everything() {
        let temp = TempDir::new().unwrap();
        let cache = RepoCache::in_memory(temp.path()).unwrap();
        let a = entry(&cache, "https://example.com/a", "v1");
        let b = entry(&cache, "https://example.com/b", "v1");
        cache.record(&a).unwrap();
        cache.record(&b).unwrap();

        assert_eq!(cache.clean().unwrap(), 2);
        assert!(cache.entries().unwrap().is_empty());
        assert!(!a.checkout().exists());
        assert!(cache.repos_dir().exists());
    }

    #[test]
    fn test_gc_keeps_referenced_entries() {
        let temp = TempDir::new().unwrap();
        let cache = RepoCache::in_memory(temp.path()).unwrap();
        let old = entry(&cache, "https://example.com/hooks", "v1");
        let new = entry(&cache, "https://example.com/hooks", "v2");
        cache.record(&old).unwrap();
        cache.record(&new).unwrap();
        // Interrupted fetch left a directory without a record
        fs::create_dir_all(cache.checkout_path("stray")).unwrap();

        let keep: HashSet<String> = [new.key.clone()].into_iter().collect();
        assert_eq!(cache.gc(&keep).unwrap(), 2);

        let remaining = cache.entries().unwrap();
        assert_eq!(remaining, vec![new.clone()]);
        assert!(new.checkout().exists());
        assert!(!old.checkout().exists());
    }
}
