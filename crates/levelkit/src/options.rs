//! Option records: general, read and write options.
//!
//! Each record owns exactly one native options handle. Setters write through
//! to that handle immediately and keep a Rust-side copy of the value, since
//! the engine offers no getters. The handle is released when the record is
//! dropped, so use after release cannot be expressed.
//!
//! No range checking happens here; the engine clamps or rejects values when
//! the database is opened. [`Config::validate`](crate::Config::validate) is the
//! place for up-front checks.

use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::ptr::NonNull;

use leveldb_sys::{
    leveldb_options_create, leveldb_options_destroy, leveldb_options_set_block_restart_interval,
    leveldb_options_set_block_size, leveldb_options_set_compression,
    leveldb_options_set_create_if_missing, leveldb_options_set_error_if_exists,
    leveldb_options_set_max_open_files, leveldb_options_set_paranoid_checks,
    leveldb_options_set_write_buffer_size, leveldb_options_t, leveldb_readoptions_create,
    leveldb_readoptions_destroy, leveldb_readoptions_set_fill_cache,
    leveldb_readoptions_set_verify_checksums, leveldb_readoptions_t, leveldb_writeoptions_create,
    leveldb_writeoptions_destroy, leveldb_writeoptions_set_sync, leveldb_writeoptions_t,
};

/// Engine default write buffer (4MB)
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 4 * 1024 * 1024;
/// Engine default open file limit
pub const DEFAULT_MAX_OPEN_FILES: i32 = 1000;
/// Engine default uncompressed block size (4KB)
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;
/// Engine default keys between restart points
pub const DEFAULT_BLOCK_RESTART_INTERVAL: i32 = 16;

/// Wrap a freshly created native handle. The engine allocates with
/// `operator new`, so null only means allocation failure.
fn acquire<T>(raw: *mut T) -> NonNull<T> {
    match NonNull::new(raw) {
        Some(handle) => handle,
        None => handle_alloc_error(Layout::new::<*mut T>()),
    }
}

/// Block compression for table files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Blocks are stored as written
    None,
    /// Snappy-compressed blocks. The engine is built with the `snappy`
    /// feature of `leveldb-sys`; without it this setting is silently ignored.
    #[default]
    Snappy,
}

impl Compression {
    fn to_native(self) -> leveldb_sys::Compression {
        match self {
            Compression::None => leveldb_sys::Compression::No,
            Compression::Snappy => leveldb_sys::Compression::Snappy,
        }
    }
}

/// General options, consumed by open, repair and destroy.
pub struct Options {
    raw: NonNull<leveldb_options_t>,
    create_if_missing: bool,
    error_if_exists: bool,
    paranoid_checks: bool,
    write_buffer_size: usize,
    max_open_files: i32,
    block_size: usize,
    block_restart_interval: i32,
    compression: Compression,
}

// SAFETY: the handle is exclusively owned; the engine only reads it during a
// call and mutation requires `&mut self`.
unsafe impl Send for Options {}
unsafe impl Sync for Options {}

impl Options {
    /// Allocate a native options handle holding the engine defaults.
    pub fn new() -> Self {
        // SAFETY: no preconditions; ownership of the returned handle moves to Self.
        let raw = acquire(unsafe { leveldb_options_create() });
        Self {
            raw,
            create_if_missing: false,
            error_if_exists: false,
            paranoid_checks: false,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            block_size: DEFAULT_BLOCK_SIZE,
            block_restart_interval: DEFAULT_BLOCK_RESTART_INTERVAL,
            compression: Compression::default(),
        }
    }

    /// Create the database directory on open if it does not exist.
    pub fn set_create_if_missing(&mut self, value: bool) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_options_set_create_if_missing(self.raw.as_ptr(), u8::from(value)) };
        self.create_if_missing = value;
        self
    }

    /// Fail open if a database already exists.
    pub fn set_error_if_exists(&mut self, value: bool) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_options_set_error_if_exists(self.raw.as_ptr(), u8::from(value)) };
        self.error_if_exists = value;
        self
    }

    /// Stop at the first sign of corruption instead of skipping bad data.
    pub fn set_paranoid_checks(&mut self, value: bool) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_options_set_paranoid_checks(self.raw.as_ptr(), u8::from(value)) };
        self.paranoid_checks = value;
        self
    }

    /// Bytes buffered in the memtable before it is flushed to a table file.
    pub fn set_write_buffer_size(&mut self, bytes: usize) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_options_set_write_buffer_size(self.raw.as_ptr(), bytes) };
        self.write_buffer_size = bytes;
        self
    }

    /// Table files the engine may keep open at once.
    pub fn set_max_open_files(&mut self, count: i32) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_options_set_max_open_files(self.raw.as_ptr(), count) };
        self.max_open_files = count;
        self
    }

    /// Approximate uncompressed size of a table block.
    pub fn set_block_size(&mut self, bytes: usize) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_options_set_block_size(self.raw.as_ptr(), bytes) };
        self.block_size = bytes;
        self
    }

    /// Keys between restart points for delta encoding within a block.
    pub fn set_block_restart_interval(&mut self, interval: i32) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_options_set_block_restart_interval(self.raw.as_ptr(), interval) };
        self.block_restart_interval = interval;
        self
    }

    /// Compression applied to each table block as it is written.
    pub fn set_compression(&mut self, compression: Compression) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_options_set_compression(self.raw.as_ptr(), compression.to_native()) };
        self.compression = compression;
        self
    }

    pub fn create_if_missing(&self) -> bool {
        self.create_if_missing
    }

    pub fn error_if_exists(&self) -> bool {
        self.error_if_exists
    }

    pub fn paranoid_checks(&self) -> bool {
        self.paranoid_checks
    }

    pub fn write_buffer_size(&self) -> usize {
        self.write_buffer_size
    }

    pub fn max_open_files(&self) -> i32 {
        self.max_open_files
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_restart_interval(&self) -> i32 {
        self.block_restart_interval
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub(crate) fn as_raw(&self) -> *mut leveldb_options_t {
        self.raw.as_ptr()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Options {
    fn drop(&mut self) {
        // SAFETY: raw was created by leveldb_options_create and is released only here.
        unsafe { leveldb_options_destroy(self.raw.as_ptr()) };
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("create_if_missing", &self.create_if_missing)
            .field("error_if_exists", &self.error_if_exists)
            .field("paranoid_checks", &self.paranoid_checks)
            .field("write_buffer_size", &self.write_buffer_size)
            .field("max_open_files", &self.max_open_files)
            .field("block_size", &self.block_size)
            .field("block_restart_interval", &self.block_restart_interval)
            .field("compression", &self.compression)
            .finish()
    }
}

/// Options for a single `get`.
pub struct ReadOptions {
    raw: NonNull<leveldb_readoptions_t>,
    verify_checksums: bool,
    fill_cache: bool,
}

// SAFETY: see `Options`.
unsafe impl Send for ReadOptions {}
unsafe impl Sync for ReadOptions {}

impl ReadOptions {
    pub fn new() -> Self {
        // SAFETY: no preconditions; ownership of the returned handle moves to Self.
        let raw = acquire(unsafe { leveldb_readoptions_create() });
        Self {
            raw,
            verify_checksums: false,
            fill_cache: true,
        }
    }

    /// Verify block checksums on every read.
    pub fn set_verify_checksums(&mut self, value: bool) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_readoptions_set_verify_checksums(self.raw.as_ptr(), u8::from(value)) };
        self.verify_checksums = value;
        self
    }

    /// Keep blocks read by this call in the block cache.
    pub fn set_fill_cache(&mut self, value: bool) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_readoptions_set_fill_cache(self.raw.as_ptr(), u8::from(value)) };
        self.fill_cache = value;
        self
    }

    pub fn verify_checksums(&self) -> bool {
        self.verify_checksums
    }

    pub fn fill_cache(&self) -> bool {
        self.fill_cache
    }

    pub(crate) fn as_raw(&self) -> *mut leveldb_readoptions_t {
        self.raw.as_ptr()
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReadOptions {
    fn drop(&mut self) {
        // SAFETY: raw was created by leveldb_readoptions_create and is released only here.
        unsafe { leveldb_readoptions_destroy(self.raw.as_ptr()) };
    }
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("verify_checksums", &self.verify_checksums)
            .field("fill_cache", &self.fill_cache)
            .finish()
    }
}

/// Options for a single `put` or `delete`.
pub struct WriteOptions {
    raw: NonNull<leveldb_writeoptions_t>,
    sync: bool,
}

// SAFETY: see `Options`.
unsafe impl Send for WriteOptions {}
unsafe impl Sync for WriteOptions {}

impl WriteOptions {
    pub fn new() -> Self {
        // SAFETY: no preconditions; ownership of the returned handle moves to Self.
        let raw = acquire(unsafe { leveldb_writeoptions_create() });
        Self { raw, sync: false }
    }

    /// Flush the engine's log to stable storage before the write returns.
    pub fn set_sync(&mut self, value: bool) -> &mut Self {
        // SAFETY: raw is live for the lifetime of self.
        unsafe { leveldb_writeoptions_set_sync(self.raw.as_ptr(), u8::from(value)) };
        self.sync = value;
        self
    }

    pub fn sync(&self) -> bool {
        self.sync
    }

    pub(crate) fn as_raw(&self) -> *mut leveldb_writeoptions_t {
        self.raw.as_ptr()
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WriteOptions {
    fn drop(&mut self) {
        // SAFETY: raw was created by leveldb_writeoptions_create and is released only here.
        unsafe { leveldb_writeoptions_destroy(self.raw.as_ptr()) };
    }
}

impl fmt::Debug for WriteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOptions")
            .field("sync", &self.sync)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_defaults() {
        let options = Options::new();
        assert!(!options.create_if_missing());
        assert!(!options.error_if_exists());
        assert!(!options.paranoid_checks());
        assert_eq!(options.write_buffer_size(), DEFAULT_WRITE_BUFFER_SIZE);
        assert_eq!(options.max_open_files(), DEFAULT_MAX_OPEN_FILES);
        assert_eq!(options.block_size(), DEFAULT_BLOCK_SIZE);
        assert_eq!(options.block_restart_interval(), DEFAULT_BLOCK_RESTART_INTERVAL);
        assert_eq!(options.compression(), Compression::Snappy);

        let read = ReadOptions::default();
        assert!(!read.verify_checksums());
        assert!(read.fill_cache());

        assert!(!WriteOptions::default().sync());
    }

    #[test]
    fn test_setters_chain_and_record() {
        let mut options = Options::new();
        options
            .set_create_if_missing(true)
            .set_error_if_exists(true)
            .set_paranoid_checks(true)
            .set_write_buffer_size(8 * 1024 * 1024)
            .set_max_open_files(500)
            .set_block_size(16 * 1024)
            .set_block_restart_interval(32)
            .set_compression(Compression::None);

        assert!(options.create_if_missing());
        assert!(options.error_if_exists());
        assert!(options.paranoid_checks());
        assert_eq!(options.write_buffer_size(), 8 * 1024 * 1024);
        assert_eq!(options.max_open_files(), 500);
        assert_eq!(options.block_size(), 16 * 1024);
        assert_eq!(options.block_restart_interval(), 32);
        assert_eq!(options.compression(), Compression::None);
    }

    #[test]
    fn test_out_of_range_values_are_forwarded() {
        let mut options = Options::new();
        options.set_max_open_files(-1).set_block_size(0);
        assert_eq!(options.max_open_files(), -1);
        assert_eq!(options.block_size(), 0);
    }

    #[test]
    fn test_read_write_setters() {
        let mut read = ReadOptions::new();
        read.set_verify_checksums(true).set_fill_cache(false);
        assert!(read.verify_checksums());
        assert!(!read.fill_cache());

        let mut write = WriteOptions::new();
        write.set_sync(true);
        assert!(write.sync());
    }

    #[test]
    fn test_repeated_create_and_drop() {
        for _ in 0..1000 {
            let mut options = Options::new();
            options.set_create_if_missing(true);
            let _read = ReadOptions::new();
            let _write = WriteOptions::new();
        }
    }

    #[test]
    fn test_records_are_send_sync() {
        assert_send_sync::<Options>();
        assert_send_sync::<ReadOptions>();
        assert_send_sync::<WriteOptions>();
    }

    #[test]
    fn test_debug_shows_values() {
        let mut write = WriteOptions::new();
        write.set_sync(true);
        assert_eq!(format!("{:?}", write), "WriteOptions { sync: true }");

        let debug = format!("{:?}", Options::new());
        assert!(debug.contains("create_if_missing: false"));
    }
}
