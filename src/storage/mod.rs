//! Storage Module
//!
//! Persistent bucket storage below the engine.
//!
//! ## Responsibilities
//! - Route every key to exactly one bucket (SHA-256 mod bucket count)
//! - Persist each bucket as its own JSON file
//! - Keep a bounded LRU of decoded buckets in memory
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── bucket_0.kvs      { "key": value, ... }
//!   ├── bucket_1.kvs
//!   └── bucket_{n-1}.kvs
//! ```
//!
//! A bucket file only exists once something has been written to it.

mod cache;
pub mod codec;
pub mod router;

pub use cache::BucketCache;
pub use router::bucket_id;

/// Decoded content of one bucket: key → JSON value
pub type Bucket = serde_json::Map<String, serde_json::Value>;
