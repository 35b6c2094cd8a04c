//! The error taxonomy described in the design: a handful of typed variants
//! used as control flow (`NotFound`, `DuplicateKey`) plus the fatal/abandon
//! classes surfaced to logs or the CLI.

use thiserror::Error;

/// Errors raised by the storage layer and everything built on it.
#[derive(Debug, Error)]
pub enum H2hDbError {
    /// Server-wide setting (character set / collation) failed validation, or
    /// the config object itself is malformed. Fatal; surfaced to the CLI.
    #[error("config error: {0}")]
    Config(String),

    /// A lookup returned no row. Used as control flow, not logged as an error.
    #[error("not found")]
    NotFound,

    /// A write violated a unique index.
    #[error("duplicate key")]
    DuplicateKey,

    /// A name/title/tag exceeded its declared byte limit.
    #[error("value exceeds {limit} bytes: {value_preview}")]
    TooLong { limit: usize, value_preview: String },

    /// A Komga HTTP call returned a non-2xx status.
    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// A file could not be opened or read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything from the underlying SQLite driver that isn't one of the
    /// above control-flow cases.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl H2hDbError {
    pub fn too_long(limit: usize, value: &str) -> Self {
        let preview: String = value.chars().take(40).collect();
        H2hDbError::TooLong {
            limit,
            value_preview: preview,
        }
    }

    /// Whether a rusqlite error represents a unique-index violation.
    pub fn is_duplicate_key(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: rusqlite::ErrorCode::ConstraintViolation,
                    ..
                },
                _,
            )
        )
    }
}

pub type Result<T> = std::result::Result<T, H2hDbError>;

/// Classification of a Komga HTTP response, per the design's retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorClass {
    /// 500/504/429 — retry up to 3 times with a 5s sleep.
    Retryable,
    /// 401 — fatal for the task, no retry.
    FatalForTask,
    /// Anything else — logged, task abandoned.
    Unknown,
}

impl RemoteErrorClass {
    pub fn classify(status: u16) -> Self {
        match status {
            500 | 504 | 429 => RemoteErrorClass::Retryable,
            401 => RemoteErrorClass::FatalForTask,
            _ => RemoteErrorClass::Unknown,
        }
    }
}
