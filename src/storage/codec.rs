//! Bucket Codec
//!
//! Reads and writes a single bucket file.
//!
//! ## File Format
//! A bucket file is a UTF-8 JSON object, pretty printed with a two-space
//! indent. Non-ASCII keys and values are written verbatim.
//!
//! ```text
//! {
//!   "name": "Egor",
//!   "tags": ["a", "b"],
//!   "nothing": null
//! }
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Result;

use super::Bucket;

/// File name prefix shared by every bucket file
const BUCKET_PREFIX: &str = "bucket_";

/// File extension of bucket files
const BUCKET_EXTENSION: &str = "kvs";

/// Generate the bucket file path for a directory and bucket id
/// (dir, 3) → "dir/bucket_3.kvs"
pub fn bucket_path(dir: &Path, id: usize) -> PathBuf {
    dir.join(format!("{}{}.{}", BUCKET_PREFIX, id, BUCKET_EXTENSION))
}

/// Parse a bucket id from a file name
/// "bucket_42.kvs" → Some(42)
pub fn parse_bucket_id(path: &Path) -> Option<usize> {
    if path.extension()?.to_str()? != BUCKET_EXTENSION {
        return None;
    }
    let name = path.file_stem()?.to_string_lossy();
    let id_str = name.strip_prefix(BUCKET_PREFIX)?;
    id_str.parse().ok()
}

/// Load a bucket from disk
///
/// Returns:
/// - an empty bucket if the file does not exist
/// - an empty bucket (plus a warning) if the file is not a UTF-8 JSON object
/// - `Err` only for I/O failures other than "not found"
pub fn load(path: &Path) -> Result<Bucket> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Bucket::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(bucket)) => {
            tracing::trace!("Loaded {} entries from {}", bucket.len(), path.display());
            Ok(bucket)
        }
        Ok(other) => {
            tracing::warn!(
                "Corrupt bucket {}: expected a JSON object, found {}; treating as empty",
                path.display(),
                json_kind(&other)
            );
            Ok(Bucket::new())
        }
        Err(e) => {
            tracing::warn!(
                "Corrupt bucket {}: {}; treating as empty",
                path.display(),
                e
            );
            Ok(Bucket::new())
        }
    }
}

/// Save a bucket to disk, replacing any previous content
pub fn save(path: &Path, bucket: &Bucket) -> Result<()> {
    let text = serde_json::to_string_pretty(bucket)?;
    fs::write(path, text)?;
    tracing::trace!("Saved {} entries to {}", bucket.len(), path.display());
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
