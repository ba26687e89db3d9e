//! Integration tests: the full open -> read/write -> close -> repair/destroy
//! lifecycle against a real engine in a temporary directory.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use levelkit::{
    destroy, major_version, minor_version, repair, Compression, Config, Database, ErrorKind,
    LevelError, Options, ReadOptions, Slice, WriteOptions, LOCK_HELD_MARKER,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn create_options() -> Options {
    let mut options = Options::new();
    options.set_create_if_missing(true);
    options
}

fn test_db() -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path(), &create_options()).unwrap();
    (db, dir)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_open_and_close() {
    let (db, _dir) = test_db();
    db.close().unwrap();
}

#[test]
fn test_open_close_reopen() {
    let dir = TempDir::new().unwrap();
    let options = create_options();

    Database::open(dir.path(), &options).unwrap().close().unwrap();
    Database::open(dir.path(), &options).unwrap().close().unwrap();
}

#[test]
fn test_open_database_twice_is_locked() {
    let dir = TempDir::new().unwrap();
    let options = create_options();

    let first = Database::open(dir.path(), &options).unwrap();
    let err = Database::open(dir.path(), &options).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Locked);
    assert!(err.is_locked());
    assert!(err.message().contains(LOCK_HELD_MARKER), "{}", err);

    // First handle is unaffected
    let write = WriteOptions::new();
    first.put(b"k", b"v", &write).unwrap();
    assert_eq!(first.get(b"k", &ReadOptions::new()).unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_lock_released_on_close() {
    let dir = TempDir::new().unwrap();
    let options = create_options();

    let first = Database::open(dir.path(), &options).unwrap();
    first.close().unwrap();

    let second = Database::open(dir.path(), &options).unwrap();
    assert!(!second.is_closed());
}

#[test]
fn test_lock_released_on_drop() {
    let dir = TempDir::new().unwrap();
    let options = create_options();

    drop(Database::open(dir.path(), &options).unwrap());
    Database::open(dir.path(), &options).unwrap();
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let options = create_options();
    {
        let db = Database::open(dir.path(), &options).unwrap();
        let write = WriteOptions::new();
        db.put(b"survive1", b"yes", &write).unwrap();
        db.put(b"survive2", b"also_yes", &write).unwrap();
        db.put(b"doomed", b"temp", &write).unwrap();
        db.delete(b"doomed", &write).unwrap();
    }
    {
        let db = Database::open(dir.path(), &Options::new()).unwrap();
        let read = ReadOptions::new();
        assert_eq!(db.get(b"survive1", &read).unwrap(), Some(b"yes".to_vec()));
        assert_eq!(db.get(b"survive2", &read).unwrap(), Some(b"also_yes".to_vec()));
        assert_eq!(db.get(b"doomed", &read).unwrap(), None);
    }
}

#[test]
fn test_closed_handle_rejects_everything() {
    let (db, _dir) = test_db();
    db.close().unwrap();

    let read = ReadOptions::new();
    let write = WriteOptions::new();
    let results: Vec<LevelError> = vec![
        db.get(b"k", &read).unwrap_err(),
        db.put(b"k", b"v", &write).unwrap_err(),
        db.delete(b"k", &write).unwrap_err(),
        db.property("leveldb.stats").unwrap_err(),
        db.close().unwrap_err(),
    ];
    for err in results {
        assert!(err.is_misuse(), "{:?}", err);
    }
}

// ---------------------------------------------------------------------------
// Point operations
// ---------------------------------------------------------------------------

#[test]
fn test_get_absent_key() {
    let (db, _dir) = test_db();
    assert_eq!(db.get(Slice::Absent, &ReadOptions::new()).unwrap(), None);
}

#[test]
fn test_get_missing_key() {
    let (db, _dir) = test_db();
    assert_eq!(db.get(b"", &ReadOptions::new()).unwrap(), None);
    assert_eq!(db.get(b"nothing", &ReadOptions::new()).unwrap(), None);
}

#[test]
fn test_put_absent_key() {
    let (db, _dir) = test_db();
    db.put(Slice::Absent, b"", &WriteOptions::new()).unwrap();
}

#[test]
fn test_put_absent_key_and_value() {
    let (db, _dir) = test_db();
    db.put(Slice::Absent, Slice::Absent, &WriteOptions::new()).unwrap();
    assert_eq!(db.get(Slice::Absent, &ReadOptions::new()).unwrap(), Some(Vec::new()));
}

#[test]
fn test_absent_value_is_present_and_empty() {
    let (db, _dir) = test_db();
    let write = WriteOptions::new();
    let read = ReadOptions::new();

    let keys: [&[u8]; 3] = [b"", b"a", &[0u8, 255, 7, 0]];
    for key in keys {
        db.put(key, Slice::Absent, &write).unwrap();
        assert_eq!(db.get(key, &read).unwrap(), Some(Vec::new()));
    }
}

#[test]
fn test_put_and_get() {
    let (db, _dir) = test_db();
    let key = [42u8];
    let value = [43u8];

    db.put(&key, &value, &WriteOptions::new()).unwrap();
    assert_eq!(db.get(&key, &ReadOptions::new()).unwrap(), Some(value.to_vec()));
}

#[test]
fn test_binary_round_trip() {
    let (db, _dir) = test_db();
    let write = WriteOptions::new();
    let read = ReadOptions::new();

    let large: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    let pairs: Vec<(Vec<u8>, Vec<u8>)> = vec![
        (vec![], vec![]),
        (vec![0], vec![0, 0, 0]),
        (b"with\0nul".to_vec(), b"value\0with\0nuls".to_vec()),
        ((0..=255u8).collect(), (0..=255u8).rev().collect()),
        (b"large".to_vec(), large),
    ];

    for (key, value) in &pairs {
        db.put(key, value, &write).unwrap();
    }
    for (key, value) in &pairs {
        assert_eq!(db.get(key, &read).unwrap().as_ref(), Some(value));
    }
}

#[test]
fn test_synced_write() {
    let (db, _dir) = test_db();
    let mut write = WriteOptions::new();
    write.set_sync(true);

    db.put(b"durable", b"yes", &write).unwrap();
    assert_eq!(db.get(b"durable", &ReadOptions::new()).unwrap(), Some(b"yes".to_vec()));
}

#[test]
fn test_delete_absent_key() {
    let (db, _dir) = test_db();
    db.delete(Slice::Absent, &WriteOptions::new()).unwrap();
}

#[test]
fn test_delete_missing_key_leaves_others() {
    let (db, _dir) = test_db();
    let write = WriteOptions::new();
    let read = ReadOptions::new();

    db.put(b"keep", b"me", &write).unwrap();
    db.delete(&[42u8], &write).unwrap();
    assert_eq!(db.get(b"keep", &read).unwrap(), Some(b"me".to_vec()));
}

#[test]
fn test_delete_key() {
    let (db, _dir) = test_db();
    let key = [42u8];

    db.put(&key, &[43u8], &WriteOptions::new()).unwrap();
    db.delete(&key, &WriteOptions::new()).unwrap();
    assert_eq!(db.get(&key, &ReadOptions::new()).unwrap(), None);
}

#[test]
fn test_read_options_variants() {
    let (db, _dir) = test_db();
    db.put(b"k", b"v", &WriteOptions::new()).unwrap();

    let mut read = ReadOptions::new();
    read.set_verify_checksums(true).set_fill_cache(false);
    assert_eq!(db.get(b"k", &read).unwrap(), Some(b"v".to_vec()));
}

// ---------------------------------------------------------------------------
// Properties and compaction
// ---------------------------------------------------------------------------

#[test]
fn test_unknown_property() {
    let (db, _dir) = test_db();
    assert_eq!(db.property("unknown-property").unwrap(), None);
}

#[test]
fn test_known_property() {
    let (db, _dir) = test_db();
    let stats = db.property("leveldb.stats").unwrap();
    assert!(stats.is_some_and(|s| !s.is_empty()));
}

#[test]
fn test_compaction_preserves_data() {
    let (db, _dir) = test_db();
    let write = WriteOptions::new();
    for i in 0..1000u32 {
        db.put(format!("key{:04}", i).as_bytes(), format!("val{:04}", i).as_bytes(), &write)
            .unwrap();
    }
    for i in (0..1000u32).step_by(2) {
        db.delete(format!("key{:04}", i).as_bytes(), &write).unwrap();
    }

    db.compact_range(Slice::Absent, Slice::Absent).unwrap();

    let read = ReadOptions::new();
    assert_eq!(db.get(b"key0000", &read).unwrap(), None);
    assert_eq!(db.get(b"key0001", &read).unwrap(), Some(b"val0001".to_vec()));
    assert_eq!(db.get(b"key0999", &read).unwrap(), Some(b"val0999".to_vec()));
}

/// Total bytes of table files under `dir`.
fn table_bytes(dir: &Path) -> u64 {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "ldb"))
        .map(|entry| entry.metadata().unwrap().len())
        .sum()
}

/// Write compressible values, flush them to tables and report table size.
fn compacted_size(compression: Compression) -> u64 {
    let dir = TempDir::new().unwrap();
    let mut options = create_options();
    options.set_compression(compression);

    let db = Database::open(dir.path(), &options).unwrap();
    let value = vec![b'a'; 1024];
    let write = WriteOptions::new();
    for i in 0..500u32 {
        db.put(&i.to_be_bytes(), &value, &write).unwrap();
    }
    db.compact_range(Slice::Absent, Slice::Absent).unwrap();
    db.close().unwrap();

    table_bytes(dir.path())
}

#[test]
fn test_snappy_compresses_tables() {
    let plain = compacted_size(Compression::None);
    let snappy = compacted_size(Compression::Snappy);

    assert!(plain > 500 * 1024, "uncompressed tables: {} bytes", plain);
    assert!(
        snappy * 4 < plain,
        "snappy {} bytes vs uncompressed {} bytes",
        snappy,
        plain
    );
}

// ---------------------------------------------------------------------------
// Repair, destroy, version
// ---------------------------------------------------------------------------

#[test]
fn test_repair_missing_database() {
    let dir = TempDir::new().unwrap();
    repair(dir.path(), &Options::new()).unwrap();
}

#[test]
fn test_repair_database() {
    let dir = TempDir::new().unwrap();
    {
        let db = Database::open(dir.path(), &create_options()).unwrap();
        db.put(&[42u8], &[43u8], &WriteOptions::new()).unwrap();
    }

    repair(dir.path(), &Options::new()).unwrap();

    let db = Database::open(dir.path(), &Options::new()).unwrap();
    assert_eq!(db.get(&[42u8], &ReadOptions::new()).unwrap(), Some(vec![43]));
}

#[test]
fn test_repair_refused_while_open() {
    let (db, dir) = test_db();
    db.put(b"k", b"v", &WriteOptions::new()).unwrap();

    let err = repair(dir.path(), &Options::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Locked);
    assert!(err.message().contains(LOCK_HELD_MARKER));
    assert_eq!(db.get(b"k", &ReadOptions::new()).unwrap(), Some(b"v".to_vec()));

    drop(db);
    repair(dir.path(), &Options::new()).unwrap();
}

#[test]
fn test_destroy_missing_database() {
    let dir = TempDir::new().unwrap();
    destroy(dir.path(), &Options::new()).unwrap();
}

#[test]
fn test_destroy_database() {
    let dir = TempDir::new().unwrap();
    {
        let db = Database::open(dir.path(), &create_options()).unwrap();
        db.put(&[42u8], &[43u8], &WriteOptions::new()).unwrap();
    }

    destroy(dir.path(), &Options::new()).unwrap();

    assert!(!dir.path().join("CURRENT").exists());
    let err = Database::open(dir.path(), &Options::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_get_version() {
    assert!(major_version() >= 1);
    assert!(minor_version() >= 0);
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

#[test]
fn test_presets_open_and_write() {
    for config in [Config::server(), Config::phone(), Config::budget()] {
        config.validate().unwrap();
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path(), &config.options()).unwrap();
        db.put(b"tier", b"ok", &config.write_options()).unwrap();
        assert_eq!(db.get(b"tier", &config.read_options()).unwrap(), Some(b"ok".to_vec()));
    }
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn test_concurrent_readers_and_writers() {
    let (db, _dir) = test_db();
    let db = Arc::new(db);

    let mut handles = vec![];
    for t in 0..8u32 {
        let db = Arc::clone(&db);
        handles.push(thread::spawn(move || {
            let write = WriteOptions::new();
            let read = ReadOptions::new();
            for i in 0..200u32 {
                let key = format!("t{}-k{}", t, i);
                let value = format!("v{}", i);
                db.put(&key, &value, &write).unwrap();
                // Read-your-writes on the same thread
                assert_eq!(db.get(&key, &read).unwrap(), Some(value.into_bytes()));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let read = ReadOptions::new();
    assert_eq!(db.get("t7-k199", &read).unwrap(), Some(b"v199".to_vec()));
}

#[test]
fn test_close_from_another_thread() {
    let (db, _dir) = test_db();
    let db = Arc::new(db);
    db.put(b"k", b"v", &WriteOptions::new()).unwrap();

    let closer = Arc::clone(&db);
    thread::spawn(move || closer.close().unwrap()).join().unwrap();

    assert!(db.is_closed());
    assert!(db.get(b"k", &ReadOptions::new()).unwrap_err().is_misuse());
}
