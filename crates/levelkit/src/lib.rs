//! levelkit — safe Rust façade over the LevelDB embedded key-value engine
//!
//! The engine itself (memtable, log, tables, compaction) is native code
//! reached through its C API. This crate owns the boundary: every native
//! handle has exactly one Rust owner that releases it on drop, byte arguments
//! are marshalled with an explicit "absent" case, and engine status messages
//! become typed [`LevelError`]s.
//!
//! # Architecture
//!
//! - **Option records**: [`Options`], [`ReadOptions`], [`WriteOptions`]
//! - **Database handle**: [`Database`] (`open`, `get`, `put`, `delete`, `property`, `close`)
//! - **Handle-free operations**: [`repair`], [`destroy`], [`major_version`], [`minor_version`]
//! - **Presets**: [`Config`] builds all three option records for a hardware tier
//!
//! # Example
//!
//! ```no_run
//! use levelkit::{Database, Options, ReadOptions, WriteOptions};
//!
//! let mut options = Options::new();
//! options.set_create_if_missing(true);
//!
//! let db = Database::open("/tmp/levelkit-demo", &options)?;
//! db.put(b"key", b"value", &WriteOptions::new())?;
//! assert_eq!(db.get(b"key", &ReadOptions::new())?, Some(b"value".to_vec()));
//! db.close()?;
//! # Ok::<(), levelkit::LevelError>(())
//! ```

pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod marshal;
pub mod options;
mod status;

// Re-export key types for convenience
pub use admin::{destroy, major_version, minor_version, repair, version};
pub use config::Config;
pub use db::Database;
pub use error::{ErrorKind, LevelError, LevelResult, LOCK_HELD_MARKER};
pub use marshal::Slice;
pub use options::{Compression, Options, ReadOptions, WriteOptions};
