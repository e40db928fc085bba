//! Tests for Engine
//!
//! These tests verify:
//! - Construction validation and directory creation
//! - Basic get/set/delete/exists operations
//! - keys/items traversal
//! - Write-through persistence and the cache bound
//! - Rebalance
//! - Command execution

use std::collections::{HashMap, HashSet};
use std::fs;

use bucketkv::config::Config;
use bucketkv::engine::Engine;
use bucketkv::protocol::{Command, Outcome};
use bucketkv::storage::{bucket_id, codec};
use bucketkv::KvError;
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();
    (temp_dir, engine)
}

fn setup_temp_engine_with(bucket_count: usize, max_cached_buckets: usize) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .bucket_count(bucket_count)
        .max_cached_buckets(max_cached_buckets)
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

fn bucket_files(dir: &std::path::Path) -> HashSet<usize> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| codec::parse_bucket_id(&entry.unwrap().path()))
        .collect()
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("nested").join("mydb");

    let engine = Engine::open(Config::builder().data_dir(&data_dir).build()).unwrap();

    assert!(data_dir.is_dir());
    assert_eq!(engine.data_dir(), data_dir.as_path());
    assert_eq!(engine.bucket_count(), 16);
    assert_eq!(engine.max_cached_buckets(), 2);
    assert_eq!(engine.cached_bucket_count(), 0);
    assert_eq!(engine.config().data_dir, data_dir);
    assert_eq!(engine.config().listen_addr, "0.0.0.0:2310");
}

#[test]
fn test_engine_open_existing_directory_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();

    Engine::open_path(temp_dir.path()).unwrap();
    Engine::open_path(temp_dir.path()).unwrap();
}

#[test]
fn test_engine_open_rejects_empty_name() {
    for name in ["", "   ", "\t\n"] {
        let result = Engine::open(Config::builder().data_dir(name).build());
        assert!(matches!(result, Err(KvError::InvalidStorageName(_))), "name {:?}", name);
    }
}

#[test]
fn test_engine_open_rejects_zero_buckets() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).bucket_count(0).build();

    assert!(matches!(Engine::open(config), Err(KvError::InvalidBucketCount(0))));
}

#[test]
fn test_engine_open_rejects_zero_cache() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_cached_buckets(0)
        .build();

    assert!(matches!(Engine::open(config), Err(KvError::InvalidCacheSize(0))));
}

#[test]
fn test_engine_open_rejects_file_path() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let result = Engine::open_path(&file_path);
    assert!(matches!(result, Err(KvError::PathCollision(ref p)) if p == &file_path));
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_set_get() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.set("hello", json!("world")).unwrap();
    assert_eq!(engine.get("hello").unwrap(), json!("world"));
}

#[test]
fn test_engine_set_overwrite() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.set("key", json!("value1")).unwrap();
    engine.set("key", json!("value2")).unwrap();

    assert_eq!(engine.get("key").unwrap(), json!("value2"));
}

#[test]
fn test_engine_round_trips_json_values() {
    let (_temp, mut engine) = setup_temp_engine();

    let values = vec![
        ("null", Value::Null),
        ("bool", json!(true)),
        ("int", json!(-42)),
        ("float", json!(3.25)),
        ("text", json!("Привет, мир 🌍")),
        ("list", json!([1, "two", null, [3]])),
        ("map", json!({"a": {"b": {"c": [true, false]}}})),
        ("юникод-ключ", json!("value")),
    ];

    for (key, value) in &values {
        engine.set(key, value.clone()).unwrap();
    }
    for (key, value) in &values {
        assert_eq!(&engine.get(key).unwrap(), value, "key {}", key);
    }
}

#[test]
fn test_engine_floats_survive_reload() {
    let temp_dir = TempDir::new().unwrap();
    let open = || {
        let config = Config::builder()
            .data_dir(temp_dir.path())
            .bucket_count(1)
            .max_cached_buckets(1)
            .build();
        Engine::open(config).unwrap()
    };

    let mut floats = vec![
        1.0715660391465826e-75,
        -1.81996730402717e-179,
        0.1,
        1.0 / 3.0,
        f64::MAX,
        f64::MIN_POSITIVE,
        5e-324,
        std::f64::consts::PI,
    ];
    // Deterministic spread of bit patterns (xorshift)
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    while floats.len() < 500 {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let f = f64::from_bits(state);
        if f.is_finite() && f != 0.0 {
            floats.push(f);
        }
    }

    {
        let mut engine = open();
        for (i, f) in floats.iter().enumerate() {
            engine.set(&format!("f{}", i), json!(f)).unwrap();
        }
        engine.flush().unwrap();
    }

    let mut engine = open();
    for (i, f) in floats.iter().enumerate() {
        let got = engine.get(&format!("f{}", i)).unwrap().as_f64().unwrap();
        assert_eq!(got.to_bits(), f.to_bits(), "stored {:e} got {:e}", f, got);
    }
}

#[test]
fn test_engine_set_rejects_blank_key() {
    let (temp, mut engine) = setup_temp_engine();

    for key in ["", " ", "\t"] {
        let result = engine.set(key, json!(1));
        assert!(matches!(result, Err(KvError::InvalidKey(_))), "key {:?}", key);
    }
    assert!(bucket_files(temp.path()).is_empty());
}

#[test]
fn test_engine_get_missing_key() {
    let (_temp, mut engine) = setup_temp_engine();

    let err = engine.get("nonexistent").unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, KvError::KeyNotFound(ref k) if k == "nonexistent"));
}

#[test]
fn test_engine_null_value_is_found() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.set("nothing", Value::Null).unwrap();

    assert_eq!(engine.get("nothing").unwrap(), Value::Null);
    assert!(engine.exists("nothing").unwrap());
}

#[test]
fn test_engine_delete_returns_value() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.set("name", json!("Egor")).unwrap();

    assert_eq!(engine.delete("name").unwrap(), Some(json!("Egor")));
    assert!(engine.get("name").unwrap_err().is_not_found());
    assert!(!engine.exists("name").unwrap());
}

#[test]
fn test_engine_delete_missing_key_writes_nothing() {
    let (temp, mut engine) = setup_temp_engine();

    assert_eq!(engine.delete("nonexistent").unwrap(), None);
    assert!(bucket_files(temp.path()).is_empty());
}

#[test]
fn test_engine_delete_missing_key_leaves_bucket_file_untouched() {
    let (temp, mut engine) = setup_temp_engine_with(1, 1);

    engine.set("present", json!(1)).unwrap();
    let path = codec::bucket_path(temp.path(), 0);
    let before = fs::read_to_string(&path).unwrap();

    assert_eq!(engine.delete("absent").unwrap(), None);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_engine_delete_twice() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.set("k", json!(1)).unwrap();
    assert_eq!(engine.delete("k").unwrap(), Some(json!(1)));
    assert_eq!(engine.delete("k").unwrap(), None);
}

#[test]
fn test_engine_exists() {
    let (_temp, mut engine) = setup_temp_engine();

    assert!(!engine.exists("k").unwrap());
    engine.set("k", json!("v")).unwrap();
    assert!(engine.exists("k").unwrap());
}

// =============================================================================
// Traversal Tests
// =============================================================================

#[test]
fn test_engine_keys_and_items() {
    let (_temp, mut engine) = setup_temp_engine_with(8, 2);

    let expected: HashMap<String, Value> = (0..25).map(|i| (format!("key{}", i), json!(i))).collect();
    for (key, value) in &expected {
        engine.set(key, value.clone()).unwrap();
    }

    let keys: HashSet<String> = engine.keys().unwrap().into_iter().collect();
    assert_eq!(keys, expected.keys().cloned().collect::<HashSet<_>>());

    let items: HashMap<String, Value> = engine.items().unwrap().into_iter().collect();
    assert_eq!(items, expected);

    assert!(engine.cached_bucket_count() <= 2);
}

#[test]
fn test_engine_keys_empty_storage() {
    let (_temp, mut engine) = setup_temp_engine();

    assert!(engine.keys().unwrap().is_empty());
    assert!(engine.items().unwrap().is_empty());
}

// =============================================================================
// Persistence / Cache Tests
// =============================================================================

#[test]
fn test_engine_set_writes_through() {
    let (temp, mut engine) = setup_temp_engine_with(4, 2);

    engine.set("k", json!({"nested": [1, 2]})).unwrap();

    // Visible on disk before any flush
    let path = codec::bucket_path(temp.path(), bucket_id("k", 4));
    let on_disk = codec::load(&path).unwrap();
    assert_eq!(on_disk.get("k"), Some(&json!({"nested": [1, 2]})));
}

#[test]
fn test_engine_small_cache_scenario() {
    let (_temp, mut engine) = setup_temp_engine_with(4, 2);

    for i in 0..10 {
        engine.set(&format!("key{}", i), json!(format!("value{}", i))).unwrap();
        assert!(engine.cached_bucket_count() <= 2);
    }

    for i in 0..10 {
        assert_eq!(engine.get(&format!("key{}", i)).unwrap(), json!(format!("value{}", i)));
        assert!(engine.cached_bucket_count() <= 2);
    }
}

#[test]
fn test_engine_evicted_buckets_match_memory() {
    let (temp, mut engine) = setup_temp_engine_with(16, 1);

    let mut expected: HashMap<String, Value> = HashMap::new();
    for i in 0..40 {
        let key = format!("k{}", i);
        engine.set(&key, json!(i)).unwrap();
        expected.insert(key, json!(i));
        if i % 3 == 0 {
            let key = format!("k{}", i / 2);
            engine.delete(&key).unwrap();
            expected.remove(&key);
        }
    }

    // Read every file directly; the cache holds at most one bucket and it
    // was written through as well
    let mut on_disk = HashMap::new();
    for id in 0..16 {
        on_disk.extend(codec::load(&codec::bucket_path(temp.path(), id)).unwrap());
    }
    assert_eq!(on_disk, expected);
}

#[test]
fn test_engine_flush_empties_cache() {
    let (_temp, mut engine) = setup_temp_engine_with(4, 4);

    for i in 0..8 {
        engine.set(&format!("k{}", i), json!(i)).unwrap();
    }
    assert!(engine.cached_bucket_count() > 0);

    engine.flush().unwrap();
    assert_eq!(engine.cached_bucket_count(), 0);

    // Data still readable after flush
    assert_eq!(engine.get("k3").unwrap(), json!(3));
}

#[test]
fn test_engine_corrupt_bucket_reads_as_empty() {
    let (temp, mut engine) = setup_temp_engine_with(1, 1);

    fs::write(codec::bucket_path(temp.path(), 0), "{ not json").unwrap();

    assert!(engine.get("anything").unwrap_err().is_not_found());
    assert!(engine.keys().unwrap().is_empty());

    // Writing again replaces the corrupt content
    engine.set("fresh", json!(1)).unwrap();
    engine.flush().unwrap();
    assert_eq!(engine.get("fresh").unwrap(), json!(1));
}

#[test]
fn test_engine_invalid_utf8_bucket_reads_as_empty() {
    let (temp, mut engine) = setup_temp_engine_with(1, 1);

    fs::write(codec::bucket_path(temp.path(), 0), b"{\"a\": \"\xff\xfe\"}").unwrap();

    assert!(engine.keys().unwrap().is_empty());
    engine.set("k", json!(1)).unwrap();
    assert_eq!(engine.get("k").unwrap(), json!(1));
    assert_eq!(engine.rebalance(2).unwrap(), 1);
}

// =============================================================================
// Rebalance Tests
// =============================================================================

#[test]
fn test_engine_rebalance_conserves_items() {
    let (temp, mut engine) = setup_temp_engine_with(4, 2);

    let expected: HashMap<String, Value> = (0..50)
        .map(|i| (format!("key{}", i), json!({"n": i, "s": format!("v{}", i)})))
        .collect();
    for (key, value) in &expected {
        engine.set(key, value.clone()).unwrap();
    }

    for new_count in [7, 1, 32, 3] {
        let moved = engine.rebalance(new_count).unwrap();
        assert_eq!(moved, expected.len());
        assert_eq!(engine.bucket_count(), new_count);
        assert_eq!(engine.cached_bucket_count(), 0);

        for (key, value) in &expected {
            assert_eq!(&engine.get(key).unwrap(), value);
        }

        // Only files of the new layout remain
        assert!(bucket_files(temp.path()).iter().all(|&id| id < new_count));
    }
}

#[test]
fn test_engine_rebalance_places_keys_by_new_count() {
    let (temp, mut engine) = setup_temp_engine_with(2, 2);

    for i in 0..20 {
        engine.set(&format!("key{}", i), json!(i)).unwrap();
    }
    engine.rebalance(5).unwrap();

    for id in 0..5 {
        let bucket = codec::load(&codec::bucket_path(temp.path(), id)).unwrap();
        for key in bucket.keys() {
            assert_eq!(bucket_id(key, 5), id);
        }
    }
}

#[test]
fn test_engine_rebalance_empty_storage() {
    let (_temp, mut engine) = setup_temp_engine_with(4, 2);

    assert_eq!(engine.rebalance(8).unwrap(), 0);
    assert_eq!(engine.bucket_count(), 8);
}

#[test]
fn test_engine_rebalance_rejects_zero() {
    let (_temp, mut engine) = setup_temp_engine_with(4, 2);
    engine.set("k", json!(1)).unwrap();

    assert!(matches!(engine.rebalance(0), Err(KvError::InvalidBucketCount(0))));
    assert_eq!(engine.bucket_count(), 4);
    assert_eq!(engine.get("k").unwrap(), json!(1));
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_engine_execute_set_and_get() {
    let (_temp, mut engine) = setup_temp_engine();

    let stored = engine
        .execute(Command::Set {
            pairs: vec![("name".to_string(), json!("Egor")), ("age".to_string(), json!("19"))],
        })
        .unwrap();
    assert!(matches!(stored, Outcome::Stored(ref pairs) if pairs.len() == 2));

    let got = engine
        .execute(Command::Get {
            keys: vec!["name".to_string(), "missing".to_string()],
        })
        .unwrap();
    assert_eq!(
        got,
        Outcome::Got(vec![
            ("name".to_string(), Some(json!("Egor"))),
            ("missing".to_string(), None),
        ])
    );
}

#[test]
fn test_engine_execute_delete() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.set("name", json!("Egor")).unwrap();

    let deleted = engine
        .execute(Command::Delete {
            keys: vec!["name".to_string(), "ghost".to_string()],
        })
        .unwrap();

    assert_eq!(
        deleted,
        Outcome::Deleted(vec![
            ("name".to_string(), Some(json!("Egor"))),
            ("ghost".to_string(), None),
        ])
    );
    assert!(!engine.exists("name").unwrap());
}

#[test]
fn test_engine_execute_set_invalid_key_fails() {
    let (_temp, mut engine) = setup_temp_engine();

    let result = engine.execute(Command::Set {
        pairs: vec![(" ".to_string(), json!("v"))],
    });
    assert!(matches!(result, Err(KvError::InvalidKey(_))));
}
