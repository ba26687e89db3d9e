//! Configuration management for levelkit
//!
//! Provides memory tier presets for different hardware classes and builds
//! the three option records from one value.

use crate::options::{Compression, Options, ReadOptions, WriteOptions};

/// Engine clamps: values outside these ranges are silently adjusted at open.
const MIN_WRITE_BUFFER_SIZE: usize = 64 * 1024;
const MAX_WRITE_BUFFER_SIZE: usize = 1024 * 1024 * 1024;
const MIN_MAX_OPEN_FILES: i32 = 74;
const MAX_MAX_OPEN_FILES: i32 = 50_000;
const MIN_BLOCK_SIZE: usize = 1024;
const MAX_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// levelkit configuration with memory tier presets
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Create the database on open if missing
    pub create_if_missing: bool,
    /// Refuse to open an existing database
    pub error_if_exists: bool,
    /// Fail on any detected corruption
    pub paranoid_checks: bool,
    /// Memtable size before flush (bytes)
    pub write_buffer_size: usize,
    /// Table files kept open by the engine
    pub max_open_files: i32,
    /// Uncompressed table block size (bytes)
    pub block_size: usize,
    /// Keys between restart points in a block
    pub block_restart_interval: i32,
    /// Table block compression
    pub compression: Compression,
    /// Sync the log on every write
    pub sync_writes: bool,
    /// Verify block checksums on reads
    pub verify_checksums: bool,
    /// Populate the block cache on reads
    pub fill_cache: bool,
}

impl Config {
    /// Server-class: large memtable, many open tables
    pub fn server() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            paranoid_checks: false,
            write_buffer_size: 64 * 1024 * 1024,
            max_open_files: 10_000,
            block_size: 16 * 1024,
            block_restart_interval: 16,
            compression: Compression::Snappy,
            sync_writes: false,
            verify_checksums: false,
            fill_cache: true,
        }
    }

    /// Phone-class: modest memtable, durable writes
    pub fn phone() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            paranoid_checks: true,
            write_buffer_size: 8 * 1024 * 1024,
            max_open_files: 500,
            block_size: 4 * 1024,
            block_restart_interval: 16,
            compression: Compression::Snappy,
            sync_writes: true,
            verify_checksums: true,
            fill_cache: true,
        }
    }

    /// Budget-class: engine minimums where they matter
    pub fn budget() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            paranoid_checks: true,
            write_buffer_size: 1024 * 1024,
            max_open_files: 100,
            block_size: 4 * 1024,
            block_restart_interval: 16,
            compression: Compression::Snappy,
            sync_writes: true,
            verify_checksums: true,
            fill_cache: false,
        }
    }

    /// Validate all configuration parameters against the engine's ranges
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_WRITE_BUFFER_SIZE..=MAX_WRITE_BUFFER_SIZE).contains(&self.write_buffer_size) {
            return Err("write_buffer_size must be in [64KB, 1GB]".into());
        }
        if !(MIN_MAX_OPEN_FILES..=MAX_MAX_OPEN_FILES).contains(&self.max_open_files) {
            return Err("max_open_files must be in [74, 50000]".into());
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err("block_size must be in [1KB, 4MB]".into());
        }
        if self.block_restart_interval < 1 {
            return Err("block_restart_interval must be >= 1".into());
        }
        Ok(())
    }

    /// General options carrying this configuration.
    pub fn options(&self) -> Options {
        let mut options = Options::new();
        options
            .set_create_if_missing(self.create_if_missing)
            .set_error_if_exists(self.error_if_exists)
            .set_paranoid_checks(self.paranoid_checks)
            .set_write_buffer_size(self.write_buffer_size)
            .set_max_open_files(self.max_open_files)
            .set_block_size(self.block_size)
            .set_block_restart_interval(self.block_restart_interval)
            .set_compression(self.compression);
        options
    }

    pub fn read_options(&self) -> ReadOptions {
        let mut options = ReadOptions::new();
        options
            .set_verify_checksums(self.verify_checksums)
            .set_fill_cache(self.fill_cache);
        options
    }

    pub fn write_options(&self) -> WriteOptions {
        let mut options = WriteOptions::new();
        options.set_sync(self.sync_writes);
        options
    }
}

impl Default for Config {
    fn default() -> Self { Self::server() }
}
