//! Bucket Router
//!
//! Maps a key to the bucket that owns it.

use sha2::{Digest, Sha256};

/// Compute the bucket id for `key` under `bucket_count` buckets.
///
/// The SHA-256 digest of the key's UTF-8 bytes is read as a big-endian
/// 256-bit integer and reduced modulo `bucket_count`. The reduction is done
/// byte by byte (`r = (r * 256 + b) mod n`), which gives the same result as
/// reducing the full integer without needing a big-number type.
///
/// `bucket_count` must be non-zero; the engine validates it before any
/// routing happens.
pub fn bucket_id(key: &str, bucket_count: usize) -> usize {
    debug_assert!(bucket_count > 0, "bucket_count must be positive");

    let digest = Sha256::digest(key.as_bytes());
    let modulus = bucket_count as u128;

    let remainder = digest
        .iter()
        .fold(0u128, |acc, &byte| (acc * 256 + byte as u128) % modulus);

    remainder as usize
}
