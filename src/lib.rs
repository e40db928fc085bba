//! # bucketkv
//!
//! A small persistent key-value store with:
//! - Keys sharded across a fixed number of JSON bucket files
//! - SHA-256 based bucket routing
//! - A bounded LRU cache of decoded buckets with write-through persistence
//! - Rebalancing to a new bucket count
//! - A command-line client and an authenticated HTTP front-end
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────────────┐
//! │   CLI (protocol)     │   │    HTTP server (axum)        │
//! └──────────┬───────────┘   └──────────────┬───────────────┘
//!            │                              │ Arc<Mutex<Engine>>
//! ┌──────────▼──────────────────────────────▼───────────────┐
//! │                        Engine                            │
//! │   get / set / delete / exists / keys / items / flush     │
//! │                      rebalance                           │
//! └──────────┬──────────────────────────────┬───────────────┘
//!            │ key → bucket id              │ bucket id → bucket
//!            ▼                              ▼
//!   ┌─────────────────┐           ┌───────────────────┐
//!   │  Bucket Router  │           │   Bucket Cache    │
//!   │ (sha256 mod n)  │           │      (LRU)        │
//!   └─────────────────┘           └─────────┬─────────┘
//!                                           │ load / save
//!                                           ▼
//!                                 ┌───────────────────┐
//!                                 │   Bucket Codec    │
//!                                 │ bucket_<id>.kvs   │
//!                                 └───────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod protocol;
pub mod engine;
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bucketkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
