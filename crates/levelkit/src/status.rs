//! Status translation for fallible engine calls.
//!
//! The engine reports failure through a `char** errptr` out-parameter: it
//! stays null on success and receives a heap-allocated message on failure.
//! [`ErrorSlot`] owns that out-parameter so the message buffer is freed on
//! every path, and [`check`] wraps a call with one.

use std::ffi::CStr;
use std::ptr;

use leveldb_sys::leveldb_free;
use libc::c_char;

use crate::error::{LevelError, LevelResult};

/// Owner of the engine's error out-parameter for a single call.
pub(crate) struct ErrorSlot {
    ptr: *mut c_char,
}

impl ErrorSlot {
    pub(crate) fn new() -> Self {
        Self { ptr: ptr::null_mut() }
    }

    /// Out-pointer to hand to the engine as `errptr`.
    pub(crate) fn as_out(&mut self) -> *mut *mut c_char {
        &mut self.ptr
    }

    /// Translate the slot: null is success, otherwise a typed engine error.
    pub(crate) fn into_result(self) -> LevelResult<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        // SAFETY: a non-null slot holds a NUL-terminated message written by the engine.
        let message = unsafe { CStr::from_ptr(self.ptr) }
            .to_string_lossy()
            .into_owned();
        Err(LevelError::from_status(message))
    }
}

impl Drop for ErrorSlot {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: the engine allocated this message and ownership passed to the slot.
            unsafe { leveldb_free(self.ptr.cast()) };
            self.ptr = ptr::null_mut();
        }
    }
}

/// Run one engine call with a fresh error slot and translate the outcome.
///
/// The call's return value is dropped on failure, so any guard it holds
/// (for example a [`NativeBuf`](crate::marshal::NativeBuf)) still releases
/// its native memory.
pub(crate) fn check<T>(call: impl FnOnce(*mut *mut c_char) -> T) -> LevelResult<T> {
    let mut slot = ErrorSlot::new();
    let value = call(slot.as_out());
    slot.into_result().map(|()| value)
}
