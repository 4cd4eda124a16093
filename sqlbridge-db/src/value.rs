//! Parameter and column value types for the safe `SQLite` wrapper.

use std::os::raw::c_int;

use crate::ffi;

/// A value that can be bound to a prepared statement parameter or read from
/// a result column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),
    /// IEEE-754 double.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Binary blob.
    Blob(Vec<u8>),
    /// SQL NULL.
    Null,
}

/// Fundamental datatype of a result column, as reported by
/// `sqlite3_column_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// `SQLITE_INTEGER`
    Integer,
    /// `SQLITE_FLOAT`
    Float,
    /// `SQLITE_TEXT`
    Text,
    /// `SQLITE_BLOB`
    Blob,
    /// `SQLITE_NULL`
    Null,
}

impl ColumnType {
    /// Maps a raw storage-class code; `None` for anything `SQLite` never returns.
    #[must_use]
    pub const fn from_code(code: c_int) -> Option<Self> {
        match code {
            ffi::SQLITE_INTEGER => Some(Self::Integer),
            ffi::SQLITE_FLOAT => Some(Self::Float),
            ffi::SQLITE_TEXT => Some(Self::Text),
            ffi::SQLITE_BLOB => Some(Self::Blob),
            ffi::SQLITE_NULL => Some(Self::Null),
            _ => None,
        }
    }

    /// The raw storage-class code.
    #[must_use]
    pub const fn code(self) -> c_int {
        match self {
            Self::Integer => ffi::SQLITE_INTEGER,
            Self::Float => ffi::SQLITE_FLOAT,
            Self::Text => ffi::SQLITE_TEXT,
            Self::Blob => ffi::SQLITE_BLOB,
            Self::Null => ffi::SQLITE_NULL,
        }
    }
}
