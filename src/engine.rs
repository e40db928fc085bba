//! Engine Module
//!
//! The storage engine: the public key-value contract built on the bucket
//! router and the bucket cache.
//!
//! ## Responsibilities
//! - Validate storage parameters and create the storage directory
//! - Route each key to its bucket and serve reads from the cache
//! - Write every mutation through to the bucket file
//! - Redistribute all data when the bucket count changes (rebalance)

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::protocol::{Command, Outcome};
use crate::storage::{bucket_id, BucketCache};

/// The main storage engine
///
/// ## Concurrency Model
///
/// Single-threaded and synchronous: every operation takes `&mut self` and
/// runs its disk I/O to completion before returning. Nothing protects a
/// storage directory against a second engine (in this or another process)
/// writing the same bucket files; callers that share an engine wrap it in a
/// lock (see `server::AppState`).
pub struct Engine {
    /// Engine configuration (bucket_count tracks rebalances)
    config: Config,

    /// Decoded buckets, bounded by `max_cached_buckets`
    cache: BucketCache,
}

impl Engine {
    /// Open or create a storage with the given config
    ///
    /// Validation order:
    /// 1. Storage name must not be empty or whitespace
    /// 2. Bucket count must be positive
    /// 3. Cache size must be positive
    /// 4. The storage path must not be an existing non-directory
    pub fn open(config: Config) -> Result<Self> {
        let name = config.data_dir.to_string_lossy();
        if name.trim().is_empty() {
            return Err(KvError::InvalidStorageName(name.into_owned()));
        }

        if config.bucket_count == 0 {
            return Err(KvError::InvalidBucketCount(config.bucket_count));
        }

        if config.max_cached_buckets == 0 {
            return Err(KvError::InvalidCacheSize(config.max_cached_buckets));
        }

        if config.data_dir.exists() && !config.data_dir.is_dir() {
            return Err(KvError::PathCollision(config.data_dir.clone()));
        }

        fs::create_dir_all(&config.data_dir)?;

        let cache = BucketCache::new(&config.data_dir, config.max_cached_buckets)?;

        tracing::debug!(
            "Opened storage {} ({} buckets, {} cached)",
            config.data_dir.display(),
            config.bucket_count,
            config.max_cached_buckets
        );

        Ok(Self { config, cache })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified storage directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Per-key misses are part of the outcome, not errors
    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        match command {
            Command::Get { keys } => {
                let mut found = Vec::with_capacity(keys.len());
                for key in keys {
                    let value = match self.get(&key) {
                        Ok(value) => Some(value),
                        Err(e) if e.is_not_found() => None,
                        Err(e) => return Err(e),
                    };
                    found.push((key, value));
                }
                Ok(Outcome::Got(found))
            }
            Command::Set { pairs } => {
                for (key, value) in &pairs {
                    self.set(key, value.clone())?;
                }
                Ok(Outcome::Stored(pairs))
            }
            Command::Delete { keys } => {
                let mut removed = Vec::with_capacity(keys.len());
                for key in keys {
                    let value = self.delete(&key)?;
                    removed.push((key, value));
                }
                Ok(Outcome::Deleted(removed))
            }
        }
    }

    /// Store a value under a key, replacing any previous value
    ///
    /// The owning bucket is written to disk before returning.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if key.trim().is_empty() {
            return Err(KvError::InvalidKey(key.to_string()));
        }

        let id = self.bucket_of(key);
        self.cache.get_or_load(id)?.insert(key.to_string(), value);
        self.cache.persist(id)
    }

    /// Get the value stored under a key
    ///
    /// A key stored with `null` is found; only absence yields `KeyNotFound`.
    pub fn get(&mut self, key: &str) -> Result<Value> {
        let id = self.bucket_of(key);
        self.cache
            .get_or_load(id)?
            .get(key)
            .cloned()
            .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
    }

    /// Remove a key, returning its value
    ///
    /// Returns `Ok(None)` for an absent key; nothing is written in that case.
    pub fn delete(&mut self, key: &str) -> Result<Option<Value>> {
        let id = self.bucket_of(key);
        let removed = self.cache.get_or_load(id)?.remove(key);

        if removed.is_some() {
            self.cache.persist(id)?;
        }
        Ok(removed)
    }

    /// Whether a key is present
    pub fn exists(&mut self, key: &str) -> Result<bool> {
        let id = self.bucket_of(key);
        Ok(self.cache.get_or_load(id)?.contains_key(key))
    }

    /// All keys, bucket by bucket
    ///
    /// Loads every bucket through the cache, so this may evict.
    pub fn keys(&mut self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for id in 0..self.config.bucket_count {
            keys.extend(self.cache.get_or_load(id)?.keys().cloned());
        }
        Ok(keys)
    }

    /// All key/value pairs, bucket by bucket
    pub fn items(&mut self) -> Result<Vec<(String, Value)>> {
        let mut items = Vec::new();
        for id in 0..self.config.bucket_count {
            let bucket = self.cache.get_or_load(id)?;
            items.extend(bucket.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Ok(items)
    }

    /// Save every cached bucket and empty the cache
    pub fn flush(&mut self) -> Result<()> {
        self.cache.flush()
    }

    /// Move all data to a new number of buckets
    ///
    /// Steps:
    /// 1. Snapshot every item
    /// 2. Flush, then delete all bucket files of the old layout
    /// 3. Switch the bucket count
    /// 4. Re-insert every item under the new layout
    /// 5. Flush again
    ///
    /// Not crash-safe: a failure after step 2 leaves the old files gone and
    /// the new layout incomplete.
    pub fn rebalance(&mut self, new_bucket_count: usize) -> Result<usize> {
        if new_bucket_count == 0 {
            return Err(KvError::InvalidBucketCount(new_bucket_count));
        }

        let old_bucket_count = self.config.bucket_count;
        tracing::info!(
            "Rebalancing {}: {} -> {} buckets",
            self.config.data_dir.display(),
            old_bucket_count,
            new_bucket_count
        );

        // Step 1: Snapshot
        let items = self.items()?;

        // Step 2: Drop the old layout
        self.cache.flush()?;
        let removed = self.cache.remove_files(old_bucket_count)?;
        tracing::debug!("Removed {} old bucket files", removed);

        // Step 3: Switch layout
        self.config.bucket_count = new_bucket_count;

        // Step 4: Re-insert under the new layout
        for (key, value) in &items {
            self.set(key, value.clone())?;
        }

        // Step 5: Flush
        self.cache.flush()?;

        tracing::info!("Rebalanced {} items", items.len());
        Ok(items.len())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the storage directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the current number of buckets
    pub fn bucket_count(&self) -> usize {
        self.config.bucket_count
    }

    /// Get the bucket cache capacity
    pub fn max_cached_buckets(&self) -> usize {
        self.config.max_cached_buckets
    }

    /// Get the number of buckets currently held in memory
    pub fn cached_bucket_count(&self) -> usize {
        self.cache.len()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn bucket_of(&self, key: &str) -> usize {
        bucket_id(key, self.config.bucket_count)
    }
}
