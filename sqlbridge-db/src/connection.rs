//! Safe wrapper around a `SQLite` database connection.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawDb`] which encapsulates the raw pointers and C type conversions.
//!
//! Every connection lives entirely in memory: the sandbox has no file system,
//! so a database is either created empty or loaded from a serialized image,
//! and is handed back to the host as a serialized image on close.

use crate::error::{DbError, DbResult};
use crate::ffi::{self, RawDb};
use crate::statement::Statement;

/// A `SQLite` database connection.
///
/// The connection is closed when dropped. It is **not** `Sync` – all access
/// must happen from a single thread (which matches the WASM single-thread
/// constraint and the one-call-in-flight bridge discipline).
#[derive(Debug)]
pub struct Connection {
    db: RawDb,
}

impl Connection {
    /// Opens an empty in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            db: RawDb::open_in_memory()?,
        })
    }

    /// Opens a database loaded from a serialized image.
    ///
    /// An empty image yields a fresh database. The image is copied into
    /// `SQLite`-owned memory, so `image` may be dropped right after the call.
    /// When `verify` is set the first page is read back immediately; a buffer
    /// that is not a database fails with `SQLITE_NOTADB` here rather than on
    /// the first query.
    pub fn open_image(image: &[u8], read_only: bool, verify: bool) -> DbResult<Self> {
        let conn = Self::open_in_memory()?;
        if image.is_empty() {
            return Ok(conn);
        }
        conn.db.deserialize(image, read_only)?;

        if verify {
            conn.execute_batch("SELECT count(*) FROM sqlite_master;")
                .map_err(|e| {
                    DbError::new(e.code.0, format!("image verification failed: {}", e.message))
                })?;
        }
        Ok(conn)
    }

    /// Serializes the main database into a contiguous image.
    ///
    /// An empty database serializes to an empty `Vec`.
    pub fn serialize(&self) -> DbResult<Vec<u8>> {
        self.db.serialize()
    }

    /// Executes one or more SQL statements separated by semicolons.
    ///
    /// No result rows are returned. This is suitable for DDL, PRAGMAs, and
    /// multi-statement scripts.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.db.exec(sql)
    }

    /// Prepares a single SQL statement.
    ///
    /// Text after the first complete statement is ignored, matching
    /// `sqlite3_prepare_v2` with a discarded tail.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement> {
        let raw = self.db.prepare(sql)?;
        Ok(Statement::new(raw))
    }

    /// `true` while an explicit transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.db.is_autocommit()
    }

    /// Rolls back the open transaction, if any.
    pub fn rollback_pending(&self) -> DbResult<bool> {
        if !self.in_transaction() {
            return Ok(false);
        }
        self.db.exec("ROLLBACK;")?;
        Ok(true)
    }

    // ── Connection state ────────────────────────────────────────────────

    /// Returns the rowid of the most recent successful INSERT.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.db.last_insert_rowid()
    }

    /// Returns the number of rows changed by the most recent statement.
    #[must_use]
    pub fn changes(&self) -> usize {
        usize::try_from(self.db.changes()).unwrap_or(0)
    }

    /// Returns the number of rows changed since the connection was opened.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        usize::try_from(self.db.total_changes()).unwrap_or(0)
    }

    /// Sets the busy handler timeout in milliseconds.
    pub fn busy_timeout(&self, ms: i32) -> DbResult<()> {
        self.db.busy_timeout(ms)
    }

    /// Most recent error message reported by the engine.
    #[must_use]
    pub fn errmsg(&self) -> String {
        self.db.errmsg()
    }

    /// Most recent result code reported by the engine.
    #[must_use]
    pub fn errcode(&self) -> i32 {
        self.db.errcode()
    }

    /// Closes the connection, reporting the code `sqlite3_close_v2` returns.
    ///
    /// Statements still alive keep the database as a zombie until they are
    /// finalized.
    pub fn close(self) -> DbResult<()> {
        let rc = self.db.close();
        if rc != ffi::SQLITE_OK {
            return Err(DbError::new(rc, format!("sqlite3_close_v2 returned {rc}")));
        }
        Ok(())
    }
}

/// Version number of the linked `SQLite` library, e.g. `3046000`.
#[must_use]
pub fn libversion_number() -> i32 {
    ffi::libversion_number()
}
