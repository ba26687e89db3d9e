//! Byte marshalling across the engine boundary
//!
//! Outbound, a [`Slice`] becomes the pointer+length pair the engine expects.
//! Inbound, buffers the engine allocates are wrapped in [`NativeBuf`], which
//! copies them into Rust-owned memory and frees the native allocation on drop.
//!
//! How `Slice::Absent` reaches the engine depends on the call:
//!
//! | Call                          | Absent becomes                  |
//! |-------------------------------|---------------------------------|
//! | `get`, `delete` key           | zero-length region (non-null)   |
//! | `put` key and value           | zero-length region (non-null)   |
//! | `compact_range` start / limit | null pointer (unbounded)        |

use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr;

use leveldb_sys::leveldb_free;
use libc::{c_char, size_t};

use crate::error::{LevelError, LevelResult};

/// A byte-sequence argument that may be absent.
///
/// `Absent` and `Present(&[])` are different values; see the module docs for
/// how each engine call treats them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Slice<'a> {
    /// No value supplied
    #[default]
    Absent,
    /// A byte sequence, possibly empty
    Present(&'a [u8]),
}

impl<'a> Slice<'a> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Slice::Absent)
    }

    /// The bytes, with `Absent` read as empty.
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Slice::Absent => &[],
            Slice::Present(bytes) => bytes,
        }
    }

    /// Pointer and length for key and value arguments.
    ///
    /// Never null: an absent or empty slice yields a dangling, well-aligned
    /// pointer with length 0, which the engine never dereferences.
    pub(crate) fn as_region(&self) -> (*const c_char, size_t) {
        let bytes = self.as_bytes();
        (bytes.as_ptr().cast(), bytes.len())
    }

    /// Pointer and length for range bounds, where null means unbounded.
    pub(crate) fn as_bound(&self) -> (*const c_char, size_t) {
        match self {
            Slice::Absent => (ptr::null(), 0),
            Slice::Present(bytes) => (bytes.as_ptr().cast(), bytes.len()),
        }
    }
}

impl<'a> From<&'a [u8]> for Slice<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Slice::Present(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Slice<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Slice::Present(bytes.as_slice())
    }
}

impl<'a> From<&'a Vec<u8>> for Slice<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Slice::Present(bytes.as_slice())
    }
}

impl<'a> From<&'a str> for Slice<'a> {
    fn from(s: &'a str) -> Self {
        Slice::Present(s.as_bytes())
    }
}

impl<'a> From<&'a String> for Slice<'a> {
    fn from(s: &'a String) -> Self {
        Slice::Present(s.as_bytes())
    }
}

impl<'a> From<Option<&'a [u8]>> for Slice<'a> {
    fn from(bytes: Option<&'a [u8]>) -> Self {
        bytes.map_or(Slice::Absent, Slice::Present)
    }
}

/// Owns a buffer allocated by the engine (`get` values, property strings).
///
/// The allocation is released with `leveldb_free` when the guard drops,
/// whichever path the caller leaves by.
pub(crate) struct NativeBuf {
    ptr: *mut c_char,
    len: usize,
}

impl NativeBuf {
    /// Take ownership of an engine buffer of `len` bytes. `ptr` may be null.
    ///
    /// # Safety
    /// A non-null `ptr` must come from the engine's allocator, be valid for
    /// `len` bytes, and not be owned by anything else.
    pub(crate) unsafe fn from_raw_parts(ptr: *mut c_char, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Take ownership of a NUL-terminated engine string. `ptr` may be null.
    ///
    /// # Safety
    /// Same as [`NativeBuf::from_raw_parts`], and a non-null `ptr` must be
    /// NUL-terminated.
    pub(crate) unsafe fn from_c_string(ptr: *mut c_char) -> Self {
        let len = if ptr.is_null() {
            0
        } else {
            CStr::from_ptr(ptr).to_bytes().len()
        };
        Self { ptr, len }
    }

    /// Copy out as bytes; `None` when the engine returned no buffer.
    pub(crate) fn to_vec(&self) -> Option<Vec<u8>> {
        if self.ptr.is_null() {
            return None;
        }
        // SAFETY: non-null ptr is valid for len bytes per the constructor contract.
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr.cast::<u8>(), self.len) };
        Some(bytes.to_vec())
    }

    /// Copy out as text, replacing invalid UTF-8.
    pub(crate) fn to_string_lossy(&self) -> Option<String> {
        self.to_vec()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Drop for NativeBuf {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: ptr came from the engine's allocator and is owned solely by this guard.
            unsafe { leveldb_free(self.ptr.cast()) };
            self.ptr = ptr::null_mut();
        }
    }
}

/// Convert a directory path into the NUL-terminated string the engine takes.
pub(crate) fn path_to_cstring(path: &Path) -> LevelResult<CString> {
    CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| LevelError::InvalidPath {
        path: path.to_path_buf(),
        reason: "contains an interior NUL byte".into(),
    })
}
