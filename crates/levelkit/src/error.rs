//! Error types for levelkit operations
//!
//! Every failure is a [`LevelError`]. Engine failures keep the engine's
//! message verbatim and carry an [`ErrorKind`] so callers can branch on a
//! stable value instead of matching message text.

use std::path::PathBuf;

/// Engine status prefixes, as produced by LevelDB's `Status::ToString()`.
const NOT_FOUND_PREFIX: &str = "NotFound: ";
const CORRUPTION_PREFIX: &str = "Corruption: ";
const NOT_SUPPORTED_PREFIX: &str = "Not implemented: ";
const INVALID_ARGUMENT_PREFIX: &str = "Invalid argument: ";
const IO_ERROR_PREFIX: &str = "IO error: ";

/// Marker the engine uses when the directory lock is taken in this process.
pub const LOCK_HELD_MARKER: &str = "already held by process";

/// Stable classification of a [`LevelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Engine reported a missing file or database
    NotFound,
    /// On-disk data failed a consistency check
    Corruption,
    /// Operation not implemented by the engine
    NotSupported,
    /// Bad argument, including `create_if_missing`/`error_if_exists` refusals
    InvalidArgument,
    /// Filesystem failure
    Io,
    /// The database directory is exclusively held by another handle
    Locked,
    /// Caller used a closed handle
    Misuse,
    /// Unrecognised engine status text
    Other,
}

impl ErrorKind {
    /// Classify an engine status message.
    pub fn classify(message: &str) -> Self {
        if let Some(detail) = message.strip_prefix(IO_ERROR_PREFIX) {
            if detail.starts_with("lock ") || detail.contains(LOCK_HELD_MARKER) {
                ErrorKind::Locked
            } else {
                ErrorKind::Io
            }
        } else if message.starts_with(NOT_FOUND_PREFIX) {
            ErrorKind::NotFound
        } else if message.starts_with(CORRUPTION_PREFIX) {
            ErrorKind::Corruption
        } else if message.starts_with(NOT_SUPPORTED_PREFIX) {
            ErrorKind::NotSupported
        } else if message.starts_with(INVALID_ARGUMENT_PREFIX) {
            ErrorKind::InvalidArgument
        } else if message.contains(LOCK_HELD_MARKER) {
            ErrorKind::Locked
        } else {
            ErrorKind::Other
        }
    }
}

/// levelkit error types with detailed context
#[derive(Debug, Clone, thiserror::Error)]
pub enum LevelError {
    /// The engine reported a failure
    #[error("{message}")]
    Engine {
        /// Classification derived from the engine message
        kind: ErrorKind,
        /// Engine message, unmodified
        message: String,
    },

    /// Operation attempted on a database that was already closed
    #[error("database at {} is closed", .path.display())]
    Closed {
        /// Directory the database was opened against
        path: PathBuf,
    },

    /// Path cannot be passed to the engine
    #[error("invalid database path {}: {reason}", .path.display())]
    InvalidPath {
        /// Offending path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },
}

impl LevelError {
    /// Build an engine error from the raw status message.
    pub fn from_status(message: impl Into<String>) -> Self {
        let message = message.into();
        LevelError::Engine {
            kind: ErrorKind::classify(&message),
            message,
        }
    }

    /// Stable classification, for branching without matching message text.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LevelError::Engine { kind, .. } => *kind,
            LevelError::Closed { .. } => ErrorKind::Misuse,
            LevelError::InvalidPath { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Engine message for engine failures, the display text otherwise.
    pub fn message(&self) -> String {
        match self {
            LevelError::Engine { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True when the directory lock is held by another open handle.
    pub fn is_locked(&self) -> bool {
        self.kind() == ErrorKind::Locked
    }

    /// True for caller contract violations; these are never worth retrying.
    pub fn is_misuse(&self) -> bool {
        self.kind() == ErrorKind::Misuse
    }

    /// True when the engine reported a missing file or database.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type alias for levelkit operations
pub type LevelResult<T> = Result<T, LevelError>;
