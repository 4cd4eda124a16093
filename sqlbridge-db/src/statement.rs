//! Safe wrapper around a `SQLite` prepared statement.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawStmt`] which encapsulates the raw pointers and C type conversions.

use std::os::raw::c_int;

use crate::error::{DbError, DbResult, ResultCode};
use crate::ffi::{self, RawStmt};
use crate::value::{ColumnType, Value};

/// Result of a single `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A result row is available (`SQLITE_ROW`).
    Row,
    /// The statement has finished executing (`SQLITE_DONE`).
    Done,
}

impl StepResult {
    /// The result code `sqlite3_step` returned.
    #[must_use]
    pub const fn code(self) -> ResultCode {
        match self {
            Self::Row => ResultCode::ROW,
            Self::Done => ResultCode::DONE,
        }
    }
}

/// A prepared `SQLite` statement.
///
/// Statements are created via [`Connection::prepare`](crate::Connection::prepare)
/// and finalized when dropped or through [`Statement::finalize`].
///
/// A statement may outlive the `Connection` value that prepared it: the
/// connection is closed with `sqlite3_close_v2`, which keeps the database
/// alive as a zombie until its last statement is finalized.
#[derive(Debug)]
pub struct Statement {
    raw: RawStmt,
}

impl Statement {
    pub(crate) const fn new(raw: RawStmt) -> Self {
        Self { raw }
    }

    // ── Binding ─────────────────────────────────────────────────────────

    /// Binds a single value to the 1-based parameter `index`.
    pub fn bind(&mut self, index: usize, value: &Value) -> DbResult<()> {
        let idx = parameter(index)?;
        match value {
            Value::Integer(v) => self.raw.bind_i64(idx, *v),
            Value::Real(v) => self.raw.bind_double(idx, *v),
            Value::Blob(v) => self.raw.bind_blob(idx, v),
            Value::Text(v) => self.raw.bind_text(idx, v),
            Value::Null => self.raw.bind_null(idx),
        }
    }

    /// Binds a 32-bit integer to the 1-based parameter `index`.
    pub fn bind_int(&mut self, index: usize, value: i32) -> DbResult<()> {
        self.raw.bind_int(parameter(index)?, value)
    }

    /// Number of SQL parameters in the statement.
    #[must_use]
    pub fn bind_parameter_count(&self) -> usize {
        usize::try_from(self.raw.bind_parameter_count()).unwrap_or(0)
    }

    /// 1-based index of the named parameter, or `0` when there is none.
    #[must_use]
    pub fn bind_parameter_index(&self, name: &str) -> usize {
        usize::try_from(self.raw.bind_parameter_index(name)).unwrap_or(0)
    }

    // ── Stepping ────────────────────────────────────────────────────────

    /// Executes a single step.
    pub fn step(&mut self) -> DbResult<StepResult> {
        if self.raw.step()? == ffi::SQLITE_ROW {
            Ok(StepResult::Row)
        } else {
            Ok(StepResult::Done)
        }
    }

    /// Resets the statement so it can be stepped again.
    pub fn reset(&mut self) -> DbResult<()> {
        self.raw.reset()
    }

    /// Finalizes the statement, reporting the code `sqlite3_finalize` returns.
    pub fn finalize(self) -> DbResult<()> {
        // The owning database may already be gone (zombie freed by this very
        // finalize), so the message must not consult it.
        let rc = self.raw.finalize();
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(DbError::new(rc, format!("sqlite3_finalize returned {rc}")))
        }
    }

    // ── Column reading ──────────────────────────────────────────────────

    /// Returns the number of columns in the result set.
    #[must_use]
    pub fn column_count(&self) -> usize {
        usize::try_from(self.raw.column_count()).unwrap_or(0)
    }

    /// Returns the name of column `idx`, or `None` when out of range.
    #[must_use]
    pub fn column_name(&self, idx: usize) -> Option<String> {
        self.raw.column_name(col(idx))
    }

    /// Reads a column as `i32`.
    #[must_use]
    pub fn column_int(&self, idx: usize) -> i32 {
        self.raw.column_int(col(idx))
    }

    /// Reads a column as `i64`.
    #[must_use]
    pub fn column_i64(&self, idx: usize) -> i64 {
        self.raw.column_int64(col(idx))
    }

    /// Reads a column as `f64`.
    #[must_use]
    pub fn column_double(&self, idx: usize) -> f64 {
        self.raw.column_double(col(idx))
    }

    /// Size in bytes of the column's blob or text value.
    #[must_use]
    pub fn column_bytes(&self, idx: usize) -> usize {
        usize::try_from(self.raw.column_bytes(col(idx))).unwrap_or(0)
    }

    /// Reads a column as a blob. Returns an empty `Vec` for NULL.
    #[must_use]
    pub fn column_blob(&self, idx: usize) -> Vec<u8> {
        self.raw.column_blob(col(idx))
    }

    /// Reads a column as a UTF-8 string. Returns an empty string for NULL.
    #[must_use]
    pub fn column_text(&self, idx: usize) -> String {
        self.column_optional_text(idx).unwrap_or_default()
    }

    /// Reads a column as text, `None` when the value is SQL NULL.
    #[must_use]
    pub fn column_optional_text(&self, idx: usize) -> Option<String> {
        self.raw.column_text(col(idx))
    }

    /// Returns the storage class of column `idx`.
    #[must_use]
    pub fn column_type(&self, idx: usize) -> ColumnType {
        ColumnType::from_code(self.raw.column_type(col(idx))).unwrap_or(ColumnType::Null)
    }
}

fn parameter(index: usize) -> DbResult<c_int> {
    c_int::try_from(index)
        .map_err(|_| DbError::new(ffi::SQLITE_RANGE, "parameter index out of range"))
}

/// Out-of-range indices map to `c_int::MAX`, which `SQLite` treats as a
/// missing column (NULL / zero results).
fn col(idx: usize) -> c_int {
    c_int::try_from(idx).unwrap_or(c_int::MAX)
}
