//! Bucket Cache
//!
//! Bounded LRU holder of decoded buckets.

use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;

use crate::error::{KvError, Result};

use super::{codec, Bucket};

/// In-memory cache of decoded buckets, ordered by recency of access
///
/// ## Write-through contract
/// The engine saves a bucket immediately after every mutation, so the copy
/// held here always matches the file on disk. Evicting an entry therefore
/// never loses data; the save performed on eviction is a plain rewrite of
/// what is already there.
pub struct BucketCache {
    /// Directory holding the bucket files
    dir: PathBuf,

    /// Cached buckets, least recently used first
    entries: LruCache<usize, Bucket>,
}

impl BucketCache {
    /// Create an empty cache holding at most `capacity` buckets
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(KvError::InvalidCacheSize(capacity))?;

        Ok(Self {
            dir: dir.into(),
            entries: LruCache::new(capacity),
        })
    }

    /// Get a bucket, loading it from disk on a miss
    ///
    /// On a miss with a full cache the least recently used bucket is saved
    /// and dropped before the requested bucket is loaded.
    pub fn get_or_load(&mut self, id: usize) -> Result<&mut Bucket> {
        if !self.entries.contains(&id) {
            if self.entries.len() >= self.entries.cap().get() {
                self.evict_lru()?;
            }

            let bucket = codec::load(&self.bucket_path(id))?;
            tracing::debug!("Loaded bucket {} ({} entries)", id, bucket.len());
            self.entries.put(id, bucket);
        }

        // get_mut also marks the entry most recently used
        self.entries
            .get_mut(&id)
            .ok_or_else(|| KvError::Io(std::io::Error::other(format!("bucket {} vanished from cache", id))))
    }

    /// Save a cached bucket to disk (no-op if it is not cached)
    pub fn persist(&self, id: usize) -> Result<()> {
        if let Some(bucket) = self.entries.peek(&id) {
            codec::save(&self.bucket_path(id), bucket)?;
        }
        Ok(())
    }

    /// Save every cached bucket and empty the cache
    pub fn flush(&mut self) -> Result<()> {
        for (id, bucket) in self.entries.iter() {
            codec::save(&self.bucket_path(*id), bucket)?;
        }

        let flushed = self.entries.len();
        self.entries.clear();
        tracing::debug!("Flushed {} cached buckets", flushed);
        Ok(())
    }

    /// Delete the files of buckets `0..bucket_count`
    ///
    /// Must only be called on an empty cache, otherwise a later eviction
    /// would write a removed bucket back.
    pub fn remove_files(&mut self, bucket_count: usize) -> Result<usize> {
        debug_assert!(self.entries.is_empty(), "remove_files on a non-empty cache");

        let mut removed = 0;
        for id in 0..bucket_count {
            match fs::remove_file(self.bucket_path(id)) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// Number of buckets currently cached
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no buckets
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Max number of cached buckets
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Whether a bucket is cached (does not change recency)
    pub fn contains(&self, id: usize) -> bool {
        self.entries.contains(&id)
    }

    /// Directory holding the bucket files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn bucket_path(&self, id: usize) -> PathBuf {
        codec::bucket_path(&self.dir, id)
    }

    /// Save the least recently used bucket, then drop it
    fn evict_lru(&mut self) -> Result<()> {
        if let Some((&id, bucket)) = self.entries.peek_lru() {
            codec::save(&self.bucket_path(id), bucket)?;
            tracing::debug!("Evicted bucket {}", id);
        }
        self.entries.pop_lru();
        Ok(())
    }
}
