//! Database handle — one open LevelDB database bound to one directory.
//!
//! Lifecycle is `Open → Closed`. [`Database::open`] is the only constructor,
//! so an unopened handle cannot exist. [`Database::close`] (or drop) releases
//! the native handle exactly once; afterwards every call returns
//! [`LevelError::Closed`].
//!
//! **Concurrency**: data calls take `&self` and hold a shared read guard for
//! the duration of the engine call, so they run in parallel and rely on the
//! engine's own thread-safety. Only `close` takes the exclusive guard, which
//! keeps the native handle alive while any call is in flight.
//!
//! Every open handle also registers its directory in a process-wide set.
//! The engine's repair takes no directory lock, so
//! [`repair`](crate::repair) checks that set before touching any files.

use std::collections::BTreeSet;
use std::ffi::CString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use leveldb_sys::{
    leveldb_close, leveldb_compact_range, leveldb_delete, leveldb_get, leveldb_open,
    leveldb_property_value, leveldb_put, leveldb_t,
};
use libc::size_t;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{LevelError, LevelResult, LOCK_HELD_MARKER};
use crate::marshal::{path_to_cstring, NativeBuf, Slice};
use crate::options::{Options, ReadOptions, WriteOptions};
use crate::status::check;

/// Directories with a live handle in this process, keyed by canonical path.
///
/// Held across `leveldb_open` and across a repair, so neither can observe
/// the other half-done.
static OPEN_DIRECTORIES: Mutex<BTreeSet<PathBuf>> = parking_lot::const_mutex(BTreeSet::new());

/// Registry key for `path`: canonical when the directory exists.
fn directory_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Run `f` while no handle in this process can be open on `path`.
///
/// Fails with a lock error, classified as
/// [`ErrorKind::Locked`](crate::ErrorKind::Locked), when one already is.
/// Opens of any directory wait until `f` returns.
pub(crate) fn with_directory_unopened<T>(
    path: &Path,
    f: impl FnOnce() -> LevelResult<T>,
) -> LevelResult<T> {
    let open_dirs = OPEN_DIRECTORIES.lock();
    if open_dirs.contains(&directory_key(path)) {
        return Err(LevelError::from_status(format!(
            "IO error: lock {}: {}",
            path.join("LOCK").display(),
            LOCK_HELD_MARKER
        )));
    }
    f()
}

/// Owned native database handle; closing happens in `Drop`.
struct RawDb {
    handle: NonNull<leveldb_t>,
    /// Entry in `OPEN_DIRECTORIES`, removed once the handle is closed
    directory: PathBuf,
}

// SAFETY: the engine's DB object is safe for concurrent use from multiple threads.
unsafe impl Send for RawDb {}
unsafe impl Sync for RawDb {}

impl RawDb {
    fn as_ptr(&self) -> *mut leveldb_t {
        self.handle.as_ptr()
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        // SAFETY: the handle came from leveldb_open and RawDb is its only owner.
        unsafe { leveldb_close(self.handle.as_ptr()) };
        OPEN_DIRECTORIES.lock().remove(&self.directory);
    }
}

/// An open LevelDB database.
///
/// `Database` is `Send + Sync`; share it across threads with `Arc`.
pub struct Database {
    /// `None` once closed
    raw: RwLock<Option<RawDb>>,
    /// Directory passed to `open`
    path: PathBuf,
}

impl Database {
    /// Open the database in directory `path`.
    ///
    /// Option values are copied by the engine during this call; `options`
    /// may be dropped as soon as it returns.
    ///
    /// Fails with [`ErrorKind::Locked`](crate::ErrorKind::Locked) when another
    /// handle holds the directory, and with
    /// [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument) when
    /// `create_if_missing` is false and no database exists (or
    /// `error_if_exists` is true and one does). Failures are never retried.
    pub fn open<P: AsRef<Path>>(path: P, options: &Options) -> LevelResult<Self> {
        let path = path.as_ref().to_path_buf();
        let c_path = path_to_cstring(&path)?;

        let mut open_dirs = OPEN_DIRECTORIES.lock();
        // SAFETY: options and c_path outlive the call; the slot owns errptr.
        let raw = check(|err| unsafe { leveldb_open(options.as_raw(), c_path.as_ptr(), err) })
            .map_err(|e| {
                if e.is_locked() {
                    warn!(path = %path.display(), error = %e, "database directory is locked");
                }
                e
            })?;

        let handle = NonNull::new(raw).ok_or_else(|| {
            LevelError::from_status(format!(
                "IO error: {}: engine returned no database handle",
                path.display()
            ))
        })?;

        let directory = directory_key(&path);
        open_dirs.insert(directory.clone());
        drop(open_dirs);
        let raw = RawDb { handle, directory };

        debug!(path = %path.display(), create_if_missing = options.create_if_missing(), "opened database");

        Ok(Self {
            raw: RwLock::new(Some(raw)),
            path,
        })
    }

    /// Run `f` against the live handle, or fail with `Closed`.
    fn with_handle<T>(&self, f: impl FnOnce(&RawDb) -> LevelResult<T>) -> LevelResult<T> {
        let guard = self.raw.read();
        match guard.as_ref() {
            Some(raw) => f(raw),
            None => Err(LevelError::Closed {
                path: self.path.clone(),
            }),
        }
    }

    /// Look up `key`. An absent key is looked up as the empty key.
    ///
    /// Returns `Ok(None)` when the key is not stored and `Ok(Some(bytes))`
    /// otherwise, including `Some(vec![])` for a stored empty value.
    pub fn get<'k>(
        &self,
        key: impl Into<Slice<'k>>,
        options: &ReadOptions,
    ) -> LevelResult<Option<Vec<u8>>> {
        let (key_ptr, key_len) = key.into().as_region();
        self.with_handle(|db| {
            let value = check(|err| {
                let mut value_len: size_t = 0;
                // SAFETY: db is live under the read guard; key bytes outlive the call.
                unsafe {
                    let ptr = leveldb_get(
                        db.as_ptr(),
                        options.as_raw(),
                        key_ptr,
                        key_len,
                        &mut value_len,
                        err,
                    );
                    NativeBuf::from_raw_parts(ptr, value_len)
                }
            })?;
            Ok(value.to_vec())
        })
    }

    /// Store `value` under `key`, overwriting any previous value.
    ///
    /// An absent key or value is stored as zero-length. With
    /// `options.sync()` set, returns only after the engine's log is synced.
    pub fn put<'k, 'v>(
        &self,
        key: impl Into<Slice<'k>>,
        value: impl Into<Slice<'v>>,
        options: &WriteOptions,
    ) -> LevelResult<()> {
        let (key_ptr, key_len) = key.into().as_region();
        let (value_ptr, value_len) = value.into().as_region();
        self.with_handle(|db| {
            // SAFETY: db is live under the read guard; key and value bytes outlive the call.
            check(|err| unsafe {
                leveldb_put(
                    db.as_ptr(),
                    options.as_raw(),
                    key_ptr,
                    key_len,
                    value_ptr,
                    value_len,
                    err,
                )
            })
        })
    }

    /// Remove `key`. Succeeds whether or not the key was stored.
    pub fn delete<'k>(&self, key: impl Into<Slice<'k>>, options: &WriteOptions) -> LevelResult<()> {
        let (key_ptr, key_len) = key.into().as_region();
        self.with_handle(|db| {
            // SAFETY: db is live under the read guard; key bytes outlive the call.
            check(|err| unsafe {
                leveldb_delete(db.as_ptr(), options.as_raw(), key_ptr, key_len, err)
            })
        })
    }

    /// Query an engine property such as `leveldb.stats`.
    ///
    /// Unknown names return `Ok(None)`; so do names the engine could never
    /// recognise (those containing NUL).
    pub fn property(&self, name: &str) -> LevelResult<Option<String>> {
        self.with_handle(|db| {
            let Ok(c_name) = CString::new(name) else {
                return Ok(None);
            };
            // SAFETY: db is live under the read guard; the returned string is owned by the guard.
            let value = unsafe {
                NativeBuf::from_c_string(leveldb_property_value(db.as_ptr(), c_name.as_ptr()))
            };
            Ok(value.to_string_lossy())
        })
    }

    /// Compact the key range `[start, limit]`. Absent bounds are unbounded,
    /// so `compact_range(Slice::Absent, Slice::Absent)` compacts everything.
    pub fn compact_range<'s, 'l>(
        &self,
        start: impl Into<Slice<'s>>,
        limit: impl Into<Slice<'l>>,
    ) -> LevelResult<()> {
        let (start_ptr, start_len) = start.into().as_bound();
        let (limit_ptr, limit_len) = limit.into().as_bound();
        self.with_handle(|db| {
            // SAFETY: db is live under the read guard; bound bytes outlive the call.
            unsafe {
                leveldb_compact_range(db.as_ptr(), start_ptr, start_len, limit_ptr, limit_len)
            };
            Ok(())
        })
    }

    /// Close the database and release the directory lock.
    ///
    /// Waits for in-flight calls on this handle. Closing twice is a caller
    /// error and returns [`LevelError::Closed`].
    pub fn close(&self) -> LevelResult<()> {
        let raw = self.raw.write().take();
        match raw {
            Some(raw) => {
                drop(raw);
                debug!(path = %self.path.display(), "closed database");
                Ok(())
            }
            None => Err(LevelError::Closed {
                path: self.path.clone(),
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.raw.read().is_none()
    }

    /// Directory the database was opened against.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}
