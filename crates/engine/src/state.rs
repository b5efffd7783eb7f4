//! Persistent key/value storage for the resolver cache index
//!
//! The cache index maps a cache key (derived from URL and revision) to the
//! record written when that checkout was fetched. Storage is abstracted
//! behind [`PersistentState`] so the resolver can run against redb on disk
//! or an in-memory map in tests.

use pinhook_core::{Error, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// Bucket holding [`crate::resolver::CacheEntry`] records
pub const REPO_CACHE_BUCKET: &str = "repoCache";

const REPO_CACHE_TABLE: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new(REPO_CACHE_BUCKET);

/// Trait for persistent state storage
pub trait PersistentState: Send + Sync {
    /// Get a value from a bucket
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Set a value in a bucket
    fn set(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key from a bucket
    fn delete(&self, bucket: &str, key: &[u8]) -> Result<()>;

    /// Delete an entire bucket
    fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// Iterate over all key-value pairs in a bucket
    fn for_each(&self, bucket: &str, f: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()>;
}

/// Persistent state implementation using redb
///
/// redb serializes concurrent writers internally, so one instance can be
/// shared by sources resolved in parallel.
pub struct RedbPersistentState {
    db: Database,
}

// Static assertions to ensure thread safety
const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}

    let _ = assert_send::<RedbPersistentState>;
    let _ = assert_sync::<RedbPersistentState>;
};

fn state_err(action: &str, e: impl std::fmt::Display) -> Error {
    Error::State(format!("Failed to {action}: {e}"))
}

impl RedbPersistentState {
    /// Create or open a persistent state database
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path).map_err(|e| state_err("create database", e))?;
        Ok(Self { db })
    }

    /// Table definition for a bucket; the index has a single table
    fn table_def(bucket: &str) -> Result<TableDefinition<'static, &'static [u8], &'static [u8]>> {
        if bucket == REPO_CACHE_BUCKET {
            Ok(REPO_CACHE_TABLE)
        } else {
            Err(Error::State(format!("Unknown bucket '{bucket}'")))
        }
    }
}

impl PersistentState for RedbPersistentState {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| state_err("begin read transaction", e))?;

        let Ok(table) = read_txn.open_table(Self::table_def(bucket)?) else {
            return Ok(None); // Table doesn't exist yet
        };

        match table.get(key) {
            Ok(Some(value)) => Ok(Some(value.value().to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(state_err("get value", e)),
        }
    }

    fn set(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| state_err("begin write transaction", e))?;
        {
            let mut table = write_txn
                .open_table(Self::table_def(bucket)?)
                .map_err(|e| state_err("open table", e))?;
            table
                .insert(key, value)
                .map_err(|e| state_err("insert value", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| state_err("commit transaction", e))?;
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| state_err("begin write transaction", e))?;
        {
            let mut table = write_txn
                .open_table(Self::table_def(bucket)?)
                .map_err(|e| state_err("open table", e))?;
            table.remove(key).map_err(|e| state_err("remove value", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| state_err("commit transaction", e))?;
        Ok(())
    }

    fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| state_err("begin write transaction", e))?;
        write_txn
            .delete_table(Self::table_def(bucket)?)
            .map_err(|e| state_err("delete table", e))?;
        write_txn
            .commit()
            .map_err(|e| state_err("commit transaction", e))?;
        Ok(())
    }

    fn for_each(&self, bucket: &str, f: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| state_err("begin read transaction", e))?;

        let Ok(table) = read_txn.open_table(Self::table_def(bucket)?) else {
            return Ok(()); // No bucket yet
        };

        let iter = table.iter().map_err(|e| state_err("iterate table", e))?;
        for item in iter {
            let (key, value) = item.map_err(|e| state_err("read item", e))?;
            f(key.value(), value.value())?;
        }

        Ok(())
    }
}

/// Inner map: key-value pairs within a bucket
type BucketData = HashMap<Vec<u8>, Vec<u8>>;
/// Outer map: bucket name -> bucket data
type StateData = HashMap<String, BucketData>;

/// In-memory persistent state, used for ephemeral caches and tests
#[derive(Default)]
pub struct MemoryState {
    data: RwLock<StateData>,
}

impl MemoryState {
    /// Create an empty in-memory state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> Error {
        Error::State("in-memory state lock poisoned".to_string())
    }
}

impl PersistentState for MemoryState {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().map_err(|_| Self::poisoned())?;
        Ok(data.get(bucket).and_then(|b| b.get(key).cloned()))
    }

    fn set(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.write().map_err(|_| Self::poisoned())?;
        data.entry(bucket.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &[u8]) -> Result<()> {
        let mut data = self.data.write().map_err(|_| Self::poisoned())?;
        if let Some(bucket_data) = data.get_mut(bucket) {
            bucket_data.remove(key);
        }
        Ok(())
    }

    fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut data = self.data.write().map_err(|_| Self::poisoned())?;
        data.remove(bucket);
        Ok(())
    }

    fn for_each(&self, bucket: &str, f: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
        let data = self.data.read().map_err(|_| Self::poisoned())?;
        if let Some(bucket_data) = data.get(bucket) {
            for (k, v) in bucket_data {
                f(k, v)?;
            }
        }
        Ok(())
    }
}
