//! Handle-free operations: repair, destroy and engine version.
//!
//! These take a directory path rather than a [`Database`](crate::Database),
//! and are meant to run while no handle is open on that path.
//!
//! `destroy` takes the engine's directory lock, so it fails with
//! [`ErrorKind::Locked`](crate::ErrorKind::Locked) while any handle, in this
//! process or another, holds the directory. The engine's repair takes no lock
//! at all and would rewrite the manifest under a live handle. `repair` is
//! therefore refused with `Locked` while a handle in this process is open on
//! the path; keeping other processes away during a repair is up to the caller.

use std::path::Path;

use leveldb_sys::{leveldb_destroy_db, leveldb_major_version, leveldb_minor_version, leveldb_repair_db};
use tracing::{info, warn};

use crate::db::with_directory_unopened;
use crate::error::LevelResult;
use crate::marshal::path_to_cstring;
use crate::options::Options;
use crate::status::check;

/// Rebuild as much of the database at `path` as can be recovered.
///
/// A path with no database is not an error: the engine creates an empty,
/// openable database there.
///
/// Fails with [`ErrorKind::Locked`](crate::ErrorKind::Locked) while a
/// [`Database`](crate::Database) in this process is open on `path`. The
/// engine does not lock the directory during repair, so a handle held by
/// another process is not detected.
pub fn repair<P: AsRef<Path>>(path: P, options: &Options) -> LevelResult<()> {
    let path = path.as_ref();
    let c_path = path_to_cstring(path)?;
    with_directory_unopened(path, || {
        // SAFETY: options and c_path outlive the call; the slot owns errptr.
        check(|err| unsafe { leveldb_repair_db(options.as_raw(), c_path.as_ptr(), err) })
    })
    .map_err(|e| {
        if e.is_locked() {
            warn!(path = %path.display(), "refusing to repair a database that is open");
        }
        e
    })?;
    info!(path = %path.display(), "repaired database");
    Ok(())
}

/// Delete every file of the database at `path`. Irreversible.
///
/// Succeeds without doing anything when no database exists at `path`.
pub fn destroy<P: AsRef<Path>>(path: P, options: &Options) -> LevelResult<()> {
    let path = path.as_ref();
    let c_path = path_to_cstring(path)?;
    // SAFETY: options and c_path outlive the call; the slot owns errptr.
    check(|err| unsafe { leveldb_destroy_db(options.as_raw(), c_path.as_ptr(), err) })?;
    info!(path = %path.display(), "destroyed database");
    Ok(())
}

/// Major version of the linked engine.
pub fn major_version() -> i32 {
    // SAFETY: pure query, no preconditions.
    unsafe { leveldb_major_version() }
}

/// Minor version of the linked engine.
pub fn minor_version() -> i32 {
    // SAFETY: pure query, no preconditions.
    unsafe { leveldb_minor_version() }
}

/// `(major, minor)` version of the linked engine.
pub fn version() -> (i32, i32) {
    (major_version(), minor_version())
}
