//! Result codes and error types for the safe `SQLite` wrapper.

use std::fmt;

use crate::ffi;

/// Primary result code returned by `SQLite` operations.
///
/// The bridge passes these through verbatim, so the type is shared by the
/// engine wrapper, the dispatcher and the host provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub i32);

impl ResultCode {
    /// Successful result.
    pub const OK: Self = Self(ffi::SQLITE_OK);
    /// Generic error. Also used for bridge protocol failures.
    pub const ERROR: Self = Self(ffi::SQLITE_ERROR);
    /// A memory allocation failed.
    pub const NOMEM: Self = Self(ffi::SQLITE_NOMEM);
    /// Attempt to write a read-only database.
    pub const READONLY: Self = Self(ffi::SQLITE_READONLY);
    /// Disk I/O error (used for storage write-back failures).
    pub const IOERR: Self = Self(ffi::SQLITE_IOERR);
    /// Unable to open the database.
    pub const CANTOPEN: Self = Self(ffi::SQLITE_CANTOPEN);
    /// Library used incorrectly, e.g. an unknown handle.
    pub const MISUSE: Self = Self(ffi::SQLITE_MISUSE);
    /// Bind or column index out of range.
    pub const RANGE: Self = Self(ffi::SQLITE_RANGE);
    /// The loaded image is not a database.
    pub const NOTADB: Self = Self(ffi::SQLITE_NOTADB);
    /// `sqlite3_step` has another row ready.
    pub const ROW: Self = Self(ffi::SQLITE_ROW);
    /// `sqlite3_step` has finished executing.
    pub const DONE: Self = Self(ffi::SQLITE_DONE);

    /// Returns `true` for [`ResultCode::OK`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == ffi::SQLITE_OK
    }

    /// The primary code with any extended bits stripped.
    #[must_use]
    pub const fn primary(self) -> Self {
        Self(self.0 & 0xff)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> Self {
        code.0
    }
}

/// Error returned by database operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sqlite error {code}: {message}")]
pub struct DbError {
    /// `SQLite` result code.
    pub code: ResultCode,
    /// Human-readable error message (from `sqlite3_errmsg` when available).
    pub message: String,
}

impl DbError {
    /// Creates a new database error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: ResultCode(code),
            message: message.into(),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
