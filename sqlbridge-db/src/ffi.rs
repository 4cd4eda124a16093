//! Raw FFI bindings to SQLite, resolved at compile time via `cfg`.
//!
//! On native targets the symbols come from the bundled SQLite that
//! `rusqlite` links (re-exported as `rusqlite::ffi`). On `wasm32` targets they
//! come from `sqlite-wasm-rs`, which ships its own WASM-compiled SQLite.
//!
//! All pointer types use `*mut c_void` so that the two backend crate types
//! (`sqlite3`, `sqlite3_stmt`) do not leak into the rest of the code.
//!
//! This is the **only** module that contains `unsafe` code. [`RawDb`] and
//! [`RawStmt`] own the raw handles and convert C types into owned Rust
//! values, so `connection.rs` and `statement.rs` stay entirely safe.

#![allow(non_camel_case_types, dead_code)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};

use crate::error::{DbError, DbResult};

// ── SQLite constants ────────────────────────────────────────────────────

pub const SQLITE_OK: c_int = 0;
pub const SQLITE_ERROR: c_int = 1;
pub const SQLITE_NOMEM: c_int = 7;
pub const SQLITE_READONLY: c_int = 8;
pub const SQLITE_IOERR: c_int = 10;
pub const SQLITE_CANTOPEN: c_int = 14;
pub const SQLITE_MISUSE: c_int = 21;
pub const SQLITE_RANGE: c_int = 25;
pub const SQLITE_NOTADB: c_int = 26;
pub const SQLITE_ROW: c_int = 100;
pub const SQLITE_DONE: c_int = 101;

// Column type constants
pub const SQLITE_INTEGER: c_int = 1;
pub const SQLITE_FLOAT: c_int = 2;
pub const SQLITE_TEXT: c_int = 3;
pub const SQLITE_BLOB: c_int = 4;
pub const SQLITE_NULL: c_int = 5;

// Open flags
pub const SQLITE_OPEN_READONLY: c_int = 0x0000_0001;
pub const SQLITE_OPEN_READWRITE: c_int = 0x0000_0002;
pub const SQLITE_OPEN_CREATE: c_int = 0x0000_0004;
pub const SQLITE_OPEN_MEMORY: c_int = 0x0000_0080;

// sqlite3_deserialize flags
pub const SQLITE_DESERIALIZE_FREEONCLOSE: u32 = 1;
pub const SQLITE_DESERIALIZE_RESIZEABLE: u32 = 2;
pub const SQLITE_DESERIALIZE_READONLY: u32 = 4;

// Destructor type alias (transient = -1 means SQLite copies the data)
pub const SQLITE_TRANSIENT: isize = -1;

/// Schema name of the primary database, NUL-terminated for the C API.
pub const MAIN_SCHEMA: &[u8] = b"main\0";

// ── Native backend ──────────────────────────────────────────────────────

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    //! Thin wrappers around `rusqlite::ffi` that normalise pointer types to
    //! `*mut c_void`, mirroring the WASM backend below.

    use super::{c_char, c_int, c_void};

    use rusqlite::ffi as native;

    // Resolved from the bundled library `rusqlite` links.
    extern "C" {
        #[link_name = "sqlite3_close_v2"]
        fn native_close_v2(db: *mut native::sqlite3) -> c_int;
        #[link_name = "sqlite3_get_autocommit"]
        fn native_get_autocommit(db: *mut native::sqlite3) -> c_int;
    }

    // ── Library ─────────────────────────────────────────────────────────

    pub unsafe fn sqlite3_libversion_number() -> c_int {
        native::sqlite3_libversion_number()
    }

    pub unsafe fn sqlite3_malloc64(n: u64) -> *mut c_void {
        native::sqlite3_malloc64(n)
    }

    pub unsafe fn sqlite3_free(ptr: *mut c_void) {
        native::sqlite3_free(ptr);
    }

    // ── Connection lifecycle ────────────────────────────────────────────

    pub unsafe fn sqlite3_open_v2(
        filename: *const c_char,
        pp_db: *mut *mut c_void,
        flags: c_int,
        z_vfs: *const c_char,
    ) -> c_int {
        let pp = pp_db.cast::<*mut native::sqlite3>();
        native::sqlite3_open_v2(filename, pp, flags, z_vfs)
    }

    pub unsafe fn sqlite3_close_v2(db: *mut c_void) -> c_int {
        native_close_v2(db.cast())
    }

    pub unsafe fn sqlite3_get_autocommit(db: *mut c_void) -> c_int {
        native_get_autocommit(db.cast())
    }

    pub unsafe fn sqlite3_busy_timeout(db: *mut c_void, ms: c_int) -> c_int {
        native::sqlite3_busy_timeout(db.cast(), ms)
    }

    // ── Images ──────────────────────────────────────────────────────────

    pub unsafe fn sqlite3_serialize(
        db: *mut c_void,
        schema: *const c_char,
        size: *mut i64,
        flags: u32,
    ) -> *mut u8 {
        native::sqlite3_serialize(db.cast(), schema, size, flags)
    }

    pub unsafe fn sqlite3_deserialize(
        db: *mut c_void,
        schema: *const c_char,
        data: *mut u8,
        db_size: i64,
        buf_size: i64,
        flags: u32,
    ) -> c_int {
        native::sqlite3_deserialize(db.cast(), schema, data, db_size, buf_size, flags)
    }

    // ── Execution ───────────────────────────────────────────────────────

    pub unsafe fn sqlite3_exec(
        db: *mut c_void,
        sql: *const c_char,
        errmsg: *mut *mut c_char,
    ) -> c_int {
        native::sqlite3_exec(db.cast(), sql, None, std::ptr::null_mut(), errmsg)
    }

    // ── Prepared statements ─────────────────────────────────────────────

    pub unsafe fn sqlite3_prepare_v2(
        db: *mut c_void,
        z_sql: *const c_char,
        n_byte: c_int,
        pp_stmt: *mut *mut c_void,
        pz_tail: *mut *const c_char,
    ) -> c_int {
        let pp = pp_stmt.cast::<*mut native::sqlite3_stmt>();
        native::sqlite3_prepare_v2(db.cast(), z_sql, n_byte, pp, pz_tail)
    }

    pub unsafe fn sqlite3_step(stmt: *mut c_void) -> c_int {
        native::sqlite3_step(stmt.cast())
    }

    pub unsafe fn sqlite3_reset(stmt: *mut c_void) -> c_int {
        native::sqlite3_reset(stmt.cast())
    }

    pub unsafe fn sqlite3_finalize(stmt: *mut c_void) -> c_int {
        native::sqlite3_finalize(stmt.cast())
    }

    // ── Parameter binding ───────────────────────────────────────────────

    pub unsafe fn sqlite3_bind_int(stmt: *mut c_void, index: c_int, value: c_int) -> c_int {
        native::sqlite3_bind_int(stmt.cast(), index, value)
    }

    pub unsafe fn sqlite3_bind_int64(stmt: *mut c_void, index: c_int, value: i64) -> c_int {
        native::sqlite3_bind_int64(stmt.cast(), index, value)
    }

    pub unsafe fn sqlite3_bind_double(stmt: *mut c_void, index: c_int, value: f64) -> c_int {
        native::sqlite3_bind_double(stmt.cast(), index, value)
    }

    pub unsafe fn sqlite3_bind_blob(
        stmt: *mut c_void,
        index: c_int,
        value: *const c_void,
        n: c_int,
    ) -> c_int {
        native::sqlite3_bind_blob(stmt.cast(), index, value, n, native::SQLITE_TRANSIENT())
    }

    pub unsafe fn sqlite3_bind_text(
        stmt: *mut c_void,
        index: c_int,
        value: *const c_char,
        n: c_int,
    ) -> c_int {
        native::sqlite3_bind_text(stmt.cast(), index, value, n, native::SQLITE_TRANSIENT())
    }

    pub unsafe fn sqlite3_bind_null(stmt: *mut c_void, index: c_int) -> c_int {
        native::sqlite3_bind_null(stmt.cast(), index)
    }

    pub unsafe fn sqlite3_bind_parameter_count(stmt: *mut c_void) -> c_int {
        native::sqlite3_bind_parameter_count(stmt.cast())
    }

    pub unsafe fn sqlite3_bind_parameter_index(
        stmt: *mut c_void,
        name: *const c_char,
    ) -> c_int {
        native::sqlite3_bind_parameter_index(stmt.cast(), name)
    }

    // ── Column reading ──────────────────────────────────────────────────

    pub unsafe fn sqlite3_column_int(stmt: *mut c_void, i_col: c_int) -> c_int {
        native::sqlite3_column_int(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_int64(stmt: *mut c_void, i_col: c_int) -> i64 {
        native::sqlite3_column_int64(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_double(stmt: *mut c_void, i_col: c_int) -> f64 {
        native::sqlite3_column_double(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_blob(stmt: *mut c_void, i_col: c_int) -> *const c_void {
        native::sqlite3_column_blob(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_bytes(stmt: *mut c_void, i_col: c_int) -> c_int {
        native::sqlite3_column_bytes(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_text(stmt: *mut c_void, i_col: c_int) -> *const c_char {
        native::sqlite3_column_text(stmt.cast(), i_col).cast()
    }

    pub unsafe fn sqlite3_column_type(stmt: *mut c_void, i_col: c_int) -> c_int {
        native::sqlite3_column_type(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_count(stmt: *mut c_void) -> c_int {
        native::sqlite3_column_count(stmt.cast())
    }

    pub unsafe fn sqlite3_column_name(stmt: *mut c_void, i_col: c_int) -> *const c_char {
        native::sqlite3_column_name(stmt.cast(), i_col)
    }

    // ── Error reporting ─────────────────────────────────────────────────

    pub unsafe fn sqlite3_errmsg(db: *mut c_void) -> *const c_char {
        native::sqlite3_errmsg(db.cast())
    }

    pub unsafe fn sqlite3_errcode(db: *mut c_void) -> c_int {
        native::sqlite3_errcode(db.cast())
    }

    // ── Changes ─────────────────────────────────────────────────────────

    pub unsafe fn sqlite3_changes(db: *mut c_void) -> c_int {
        native::sqlite3_changes(db.cast())
    }

    pub unsafe fn sqlite3_total_changes(db: *mut c_void) -> c_int {
        native::sqlite3_total_changes(db.cast())
    }

    pub unsafe fn sqlite3_last_insert_rowid(db: *mut c_void) -> i64 {
        native::sqlite3_last_insert_rowid(db.cast())
    }
}

// ── WASM backend ────────────────────────────────────────────────────────

#[cfg(target_arch = "wasm32")]
mod imp {
    //! Thin wrappers around `sqlite_wasm_rs` that normalise pointer types
    //! to `*mut c_void` so callers are backend-agnostic.

    use super::{c_char, c_int, c_void, SQLITE_TRANSIENT};

    use sqlite_wasm_rs as wasm;

    // ── Library ─────────────────────────────────────────────────────────

    pub unsafe fn sqlite3_libversion_number() -> c_int {
        wasm::sqlite3_libversion_number()
    }

    pub unsafe fn sqlite3_malloc64(n: u64) -> *mut c_void {
        wasm::sqlite3_malloc64(n)
    }

    pub unsafe fn sqlite3_free(ptr: *mut c_void) {
        wasm::sqlite3_free(ptr);
    }

    // ── Connection lifecycle ────────────────────────────────────────────

    pub unsafe fn sqlite3_open_v2(
        filename: *const c_char,
        pp_db: *mut *mut c_void,
        flags: c_int,
        z_vfs: *const c_char,
    ) -> c_int {
        // sqlite-wasm-rs expects its own opaque pointer type; cast through.
        let pp = pp_db.cast::<*mut wasm::sqlite3>();
        wasm::sqlite3_open_v2(filename.cast(), pp, flags, z_vfs.cast())
    }

    pub unsafe fn sqlite3_close_v2(db: *mut c_void) -> c_int {
        wasm::sqlite3_close_v2(db.cast())
    }

    pub unsafe fn sqlite3_get_autocommit(db: *mut c_void) -> c_int {
        wasm::sqlite3_get_autocommit(db.cast())
    }

    pub unsafe fn sqlite3_busy_timeout(db: *mut c_void, ms: c_int) -> c_int {
        wasm::sqlite3_busy_timeout(db.cast(), ms)
    }

    // ── Images ──────────────────────────────────────────────────────────

    pub unsafe fn sqlite3_serialize(
        db: *mut c_void,
        schema: *const c_char,
        size: *mut i64,
        flags: u32,
    ) -> *mut u8 {
        wasm::sqlite3_serialize(db.cast(), schema.cast(), size, flags).cast()
    }

    pub unsafe fn sqlite3_deserialize(
        db: *mut c_void,
        schema: *const c_char,
        data: *mut u8,
        db_size: i64,
        buf_size: i64,
        flags: u32,
    ) -> c_int {
        wasm::sqlite3_deserialize(db.cast(), schema.cast(), data.cast(), db_size, buf_size, flags)
    }

    // ── Execution ───────────────────────────────────────────────────────

    pub unsafe fn sqlite3_exec(
        db: *mut c_void,
        sql: *const c_char,
        errmsg: *mut *mut c_char,
    ) -> c_int {
        wasm::sqlite3_exec(
            db.cast(),
            sql.cast(),
            std::mem::transmute(std::ptr::null::<c_void>()),
            std::ptr::null_mut(),
            errmsg.cast(),
        )
    }

    // ── Prepared statements ─────────────────────────────────────────────

    pub unsafe fn sqlite3_prepare_v2(
        db: *mut c_void,
        z_sql: *const c_char,
        n_byte: c_int,
        pp_stmt: *mut *mut c_void,
        pz_tail: *mut *const c_char,
    ) -> c_int {
        let pp = pp_stmt.cast::<*mut wasm::sqlite3_stmt>();
        wasm::sqlite3_prepare_v2(db.cast(), z_sql.cast(), n_byte, pp, pz_tail.cast())
    }

    pub unsafe fn sqlite3_step(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_step(stmt.cast())
    }

    pub unsafe fn sqlite3_reset(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_reset(stmt.cast())
    }

    pub unsafe fn sqlite3_finalize(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_finalize(stmt.cast())
    }

    // ── Parameter binding ───────────────────────────────────────────────

    pub unsafe fn sqlite3_bind_int(stmt: *mut c_void, index: c_int, value: c_int) -> c_int {
        wasm::sqlite3_bind_int(stmt.cast(), index, value)
    }

    pub unsafe fn sqlite3_bind_int64(stmt: *mut c_void, index: c_int, value: i64) -> c_int {
        wasm::sqlite3_bind_int64(stmt.cast(), index, value)
    }

    pub unsafe fn sqlite3_bind_double(stmt: *mut c_void, index: c_int, value: f64) -> c_int {
        wasm::sqlite3_bind_double(stmt.cast(), index, value)
    }

    pub unsafe fn sqlite3_bind_blob(
        stmt: *mut c_void,
        index: c_int,
        value: *const c_void,
        n: c_int,
    ) -> c_int {
        wasm::sqlite3_bind_blob(stmt.cast(), index, value, n, SQLITE_TRANSIENT)
    }

    pub unsafe fn sqlite3_bind_text(
        stmt: *mut c_void,
        index: c_int,
        value: *const c_char,
        n: c_int,
    ) -> c_int {
        wasm::sqlite3_bind_text(stmt.cast(), index, value.cast(), n, SQLITE_TRANSIENT)
    }

    pub unsafe fn sqlite3_bind_null(stmt: *mut c_void, index: c_int) -> c_int {
        wasm::sqlite3_bind_null(stmt.cast(), index)
    }

    pub unsafe fn sqlite3_bind_parameter_count(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_bind_parameter_count(stmt.cast())
    }

    pub unsafe fn sqlite3_bind_parameter_index(
        stmt: *mut c_void,
        name: *const c_char,
    ) -> c_int {
        wasm::sqlite3_bind_parameter_index(stmt.cast(), name.cast())
    }

    // ── Column reading ──────────────────────────────────────────────────

    pub unsafe fn sqlite3_column_int(stmt: *mut c_void, i_col: c_int) -> c_int {
        wasm::sqlite3_column_int(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_int64(stmt: *mut c_void, i_col: c_int) -> i64 {
        wasm::sqlite3_column_int64(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_double(stmt: *mut c_void, i_col: c_int) -> f64 {
        wasm::sqlite3_column_double(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_blob(stmt: *mut c_void, i_col: c_int) -> *const c_void {
        wasm::sqlite3_column_blob(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_bytes(stmt: *mut c_void, i_col: c_int) -> c_int {
        wasm::sqlite3_column_bytes(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_text(stmt: *mut c_void, i_col: c_int) -> *const c_char {
        wasm::sqlite3_column_text(stmt.cast(), i_col).cast()
    }

    pub unsafe fn sqlite3_column_type(stmt: *mut c_void, i_col: c_int) -> c_int {
        wasm::sqlite3_column_type(stmt.cast(), i_col)
    }

    pub unsafe fn sqlite3_column_count(stmt: *mut c_void) -> c_int {
        wasm::sqlite3_column_count(stmt.cast())
    }

    pub unsafe fn sqlite3_column_name(stmt: *mut c_void, i_col: c_int) -> *const c_char {
        wasm::sqlite3_column_name(stmt.cast(), i_col).cast()
    }

    // ── Error reporting ─────────────────────────────────────────────────

    pub unsafe fn sqlite3_errmsg(db: *mut c_void) -> *const c_char {
        wasm::sqlite3_errmsg(db.cast()).cast()
    }

    pub unsafe fn sqlite3_errcode(db: *mut c_void) -> c_int {
        wasm::sqlite3_errcode(db.cast())
    }

    // ── Changes ─────────────────────────────────────────────────────────

    pub unsafe fn sqlite3_changes(db: *mut c_void) -> c_int {
        wasm::sqlite3_changes(db.cast())
    }

    pub unsafe fn sqlite3_total_changes(db: *mut c_void) -> c_int {
        wasm::sqlite3_total_changes(db.cast())
    }

    pub unsafe fn sqlite3_last_insert_rowid(db: *mut c_void) -> i64 {
        wasm::sqlite3_last_insert_rowid(db.cast())
    }
}

use imp::*;

// ── Safe wrappers ───────────────────────────────────────────────────────

/// Path handed to `sqlite3_open_v2` for every connection.
const MEMORY_PATH: &[u8] = b":memory:\0";

fn c_string(sql: &str) -> DbResult<CString> {
    CString::new(sql).map_err(|e| DbError::new(SQLITE_ERROR, format!("nul in SQL: {e}")))
}

fn errmsg_of(db: *mut c_void) -> String {
    // SAFETY: `db` is a live handle; the message is copied before any other
    // call on the connection can invalidate it.
    unsafe {
        let ptr = sqlite3_errmsg(db);
        if ptr.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

/// Version number of the linked `SQLite` library, e.g. `3046000`.
pub fn libversion_number() -> c_int {
    // SAFETY: no arguments, no state.
    unsafe { sqlite3_libversion_number() }
}

/// Owned `sqlite3*` handle. Closed with `sqlite3_close_v2` on drop.
pub struct RawDb {
    ptr: *mut c_void,
}

// SAFETY: the handle is used by one owner at a time; it is never shared.
unsafe impl Send for RawDb {}

impl RawDb {
    /// Opens an empty in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        let flags = SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_MEMORY;
        let mut ptr: *mut c_void = std::ptr::null_mut();
        // SAFETY: the path is NUL-terminated and `ptr` is a valid out-pointer.
        let rc = unsafe {
            sqlite3_open_v2(MEMORY_PATH.as_ptr().cast(), &mut ptr, flags, std::ptr::null())
        };
        if rc != SQLITE_OK {
            let msg = if ptr.is_null() {
                format!("sqlite3_open_v2 returned {rc}")
            } else {
                let msg = errmsg_of(ptr);
                // SAFETY: a failed open still hands back a handle to release.
                unsafe {
                    sqlite3_close_v2(ptr);
                }
                msg
            };
            return Err(DbError::new(rc, msg));
        }
        Ok(Self { ptr })
    }

    /// Replaces the main database with a copy of `image`.
    pub fn deserialize(&self, image: &[u8], read_only: bool) -> DbResult<()> {
        let size = i64::try_from(image.len())
            .map_err(|_| DbError::new(SQLITE_NOMEM, "image too large"))?;
        let len =
            u64::try_from(image.len()).map_err(|_| DbError::new(SQLITE_NOMEM, "image too large"))?;

        // SAFETY: a positive size is requested; null is checked below.
        let buf = unsafe { sqlite3_malloc64(len) }.cast::<u8>();
        if buf.is_null() {
            return Err(DbError::new(SQLITE_NOMEM, "cannot allocate image buffer"));
        }
        // SAFETY: `buf` holds `image.len()` bytes and cannot overlap `image`.
        unsafe {
            std::ptr::copy_nonoverlapping(image.as_ptr(), buf, image.len());
        }

        let mut flags = SQLITE_DESERIALIZE_FREEONCLOSE;
        flags |= if read_only {
            SQLITE_DESERIALIZE_READONLY
        } else {
            SQLITE_DESERIALIZE_RESIZEABLE
        };
        // SAFETY: with FREEONCLOSE SQLite owns `buf` from here on, even when
        // the call fails.
        let rc = unsafe {
            sqlite3_deserialize(self.ptr, MAIN_SCHEMA.as_ptr().cast(), buf, size, size, flags)
        };
        self.check(rc)
    }

    /// Copies the main database into a `Vec`. An empty database yields an
    /// empty `Vec`.
    pub fn serialize(&self) -> DbResult<Vec<u8>> {
        let mut size: i64 = 0;
        // SAFETY: the schema is NUL-terminated and `size` is a valid out-pointer.
        let ptr = unsafe { sqlite3_serialize(self.ptr, MAIN_SCHEMA.as_ptr().cast(), &mut size, 0) };
        if ptr.is_null() {
            if size <= 0 {
                return Ok(Vec::new());
            }
            return Err(DbError::new(SQLITE_NOMEM, "cannot serialize image"));
        }
        let len = usize::try_from(size).unwrap_or(0);
        // SAFETY: SQLite returned `size` readable bytes at `ptr`, which we own
        // and must release with `sqlite3_free`.
        let image = unsafe {
            let image = std::slice::from_raw_parts(ptr, len).to_vec();
            sqlite3_free(ptr.cast());
            image
        };
        Ok(image)
    }

    /// Runs one or more statements, discarding any rows.
    pub fn exec(&self, sql: &str) -> DbResult<()> {
        let c_sql = c_string(sql)?;
        let mut errmsg: *mut c_char = std::ptr::null_mut();
        // SAFETY: `c_sql` outlives the call and `errmsg` is a valid out-pointer.
        let rc = unsafe { sqlite3_exec(self.ptr, c_sql.as_ptr(), &mut errmsg) };
        if rc == SQLITE_OK {
            return Ok(());
        }
        let msg = if errmsg.is_null() {
            self.errmsg()
        } else {
            // SAFETY: SQLite allocated the message; it is copied, then freed.
            unsafe {
                let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                sqlite3_free(errmsg.cast());
                msg
            }
        };
        Err(DbError::new(rc, msg))
    }

    /// Compiles the first statement in `sql`; the tail is discarded.
    pub fn prepare(&self, sql: &str) -> DbResult<RawStmt> {
        let c_sql = c_string(sql)?;
        let mut stmt: *mut c_void = std::ptr::null_mut();
        // SAFETY: `c_sql` is NUL-terminated (length -1) and `stmt` is a valid
        // out-pointer.
        let rc = unsafe {
            sqlite3_prepare_v2(self.ptr, c_sql.as_ptr(), -1, &mut stmt, std::ptr::null_mut())
        };
        self.check(rc)?;
        if stmt.is_null() {
            // Empty SQL or a lone comment: SQLite reports OK with no statement.
            return Err(DbError::new(SQLITE_MISUSE, "no statement in SQL"));
        }
        Ok(RawStmt { ptr: stmt, db: self.ptr })
    }

    pub fn busy_timeout(&self, ms: c_int) -> DbResult<()> {
        // SAFETY: live handle.
        let rc = unsafe { sqlite3_busy_timeout(self.ptr, ms) };
        self.check(rc)
    }

    /// `false` while an explicit transaction is open.
    pub fn is_autocommit(&self) -> bool {
        // SAFETY: live handle.
        unsafe { sqlite3_get_autocommit(self.ptr) != 0 }
    }

    pub fn changes(&self) -> c_int {
        // SAFETY: live handle.
        unsafe { sqlite3_changes(self.ptr) }
    }

    pub fn total_changes(&self) -> c_int {
        // SAFETY: live handle.
        unsafe { sqlite3_total_changes(self.ptr) }
    }

    pub fn last_insert_rowid(&self) -> i64 {
        // SAFETY: live handle.
        unsafe { sqlite3_last_insert_rowid(self.ptr) }
    }

    pub fn errcode(&self) -> c_int {
        // SAFETY: live handle.
        unsafe { sqlite3_errcode(self.ptr) }
    }

    pub fn errmsg(&self) -> String {
        errmsg_of(self.ptr)
    }

    /// Closes with `sqlite3_close_v2` and returns its code. Statements still
    /// alive keep the database as a zombie until they are finalized.
    pub fn close(mut self) -> c_int {
        let ptr = std::mem::replace(&mut self.ptr, std::ptr::null_mut());
        // SAFETY: the handle is taken out, so `Drop` will not close it again.
        unsafe { sqlite3_close_v2(ptr) }
    }

    fn check(&self, rc: c_int) -> DbResult<()> {
        if rc == SQLITE_OK {
            Ok(())
        } else {
            Err(DbError::new(rc, self.errmsg()))
        }
    }
}

impl std::fmt::Debug for RawDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawDb").field(&self.ptr).finish()
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: the handle is still owned by this value.
            unsafe {
                sqlite3_close_v2(self.ptr);
            }
        }
    }
}

/// Owned `sqlite3_stmt*` handle. Finalized on drop.
///
/// Not tied to a borrow of [`RawDb`]: `close_v2` keeps the database alive
/// until the last statement is finalized, so a statement may outlive the
/// connection value that prepared it.
pub struct RawStmt {
    ptr: *mut c_void,
    db: *mut c_void,
}

// SAFETY: single owner; never shared across threads.
unsafe impl Send for RawStmt {}

impl RawStmt {
    pub fn bind_int(&self, index: c_int, value: c_int) -> DbResult<()> {
        // SAFETY: live statement.
        let rc = unsafe { sqlite3_bind_int(self.ptr, index, value) };
        self.check(rc)
    }

    pub fn bind_i64(&self, index: c_int, value: i64) -> DbResult<()> {
        // SAFETY: live statement.
        let rc = unsafe { sqlite3_bind_int64(self.ptr, index, value) };
        self.check(rc)
    }

    pub fn bind_double(&self, index: c_int, value: f64) -> DbResult<()> {
        // SAFETY: live statement.
        let rc = unsafe { sqlite3_bind_double(self.ptr, index, value) };
        self.check(rc)
    }

    pub fn bind_blob(&self, index: c_int, value: &[u8]) -> DbResult<()> {
        let len =
            c_int::try_from(value.len()).map_err(|_| DbError::new(SQLITE_RANGE, "blob too large"))?;
        // SAFETY: SQLITE_TRANSIENT makes SQLite copy the bytes before returning.
        let rc = unsafe { sqlite3_bind_blob(self.ptr, index, value.as_ptr().cast(), len) };
        self.check(rc)
    }

    pub fn bind_text(&self, index: c_int, value: &str) -> DbResult<()> {
        let len =
            c_int::try_from(value.len()).map_err(|_| DbError::new(SQLITE_RANGE, "text too large"))?;
        // SAFETY: length-delimited and copied (SQLITE_TRANSIENT), so embedded
        // NULs survive and `value` may be dropped afterwards.
        let rc = unsafe { sqlite3_bind_text(self.ptr, index, value.as_ptr().cast(), len) };
        self.check(rc)
    }

    pub fn bind_null(&self, index: c_int) -> DbResult<()> {
        // SAFETY: live statement.
        let rc = unsafe { sqlite3_bind_null(self.ptr, index) };
        self.check(rc)
    }

    pub fn bind_parameter_count(&self) -> c_int {
        // SAFETY: live statement.
        unsafe { sqlite3_bind_parameter_count(self.ptr) }
    }

    /// `0` when no parameter has that name.
    pub fn bind_parameter_index(&self, name: &str) -> c_int {
        let Ok(c_name) = CString::new(name) else {
            return 0;
        };
        // SAFETY: `c_name` outlives the call.
        unsafe { sqlite3_bind_parameter_index(self.ptr, c_name.as_ptr()) }
    }

    /// Returns `SQLITE_ROW` or `SQLITE_DONE`; anything else is an error.
    pub fn step(&self) -> DbResult<c_int> {
        // SAFETY: live statement.
        let rc = unsafe { sqlite3_step(self.ptr) };
        match rc {
            SQLITE_ROW | SQLITE_DONE => Ok(rc),
            _ => Err(self.error(rc)),
        }
    }

    pub fn reset(&self) -> DbResult<()> {
        // SAFETY: live statement.
        let rc = unsafe { sqlite3_reset(self.ptr) };
        self.check(rc)
    }

    /// Finalizes and returns the code `sqlite3_finalize` reports.
    pub fn finalize(mut self) -> c_int {
        let ptr = std::mem::replace(&mut self.ptr, std::ptr::null_mut());
        // SAFETY: the handle is taken out, so `Drop` will not finalize it again.
        unsafe { sqlite3_finalize(ptr) }
    }

    pub fn column_count(&self) -> c_int {
        // SAFETY: live statement.
        unsafe { sqlite3_column_count(self.ptr) }
    }

    /// `None` when `idx` is out of range.
    pub fn column_name(&self, idx: c_int) -> Option<String> {
        // SAFETY: the name is copied before the statement can change.
        unsafe {
            let ptr = sqlite3_column_name(self.ptr, idx);
            if ptr.is_null() {
                return None;
            }
            Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }

    pub fn column_int(&self, idx: c_int) -> c_int {
        // SAFETY: live statement; bad indices read as NULL.
        unsafe { sqlite3_column_int(self.ptr, idx) }
    }

    pub fn column_int64(&self, idx: c_int) -> i64 {
        // SAFETY: live statement; bad indices read as NULL.
        unsafe { sqlite3_column_int64(self.ptr, idx) }
    }

    pub fn column_double(&self, idx: c_int) -> f64 {
        // SAFETY: live statement; bad indices read as NULL.
        unsafe { sqlite3_column_double(self.ptr, idx) }
    }

    pub fn column_bytes(&self, idx: c_int) -> c_int {
        // SAFETY: live statement; bad indices read as NULL.
        unsafe { sqlite3_column_bytes(self.ptr, idx) }
    }

    pub fn column_type(&self, idx: c_int) -> c_int {
        // SAFETY: live statement; bad indices read as NULL.
        unsafe { sqlite3_column_type(self.ptr, idx) }
    }

    /// Copy of the column's blob. Empty for NULL.
    pub fn column_blob(&self, idx: c_int) -> Vec<u8> {
        // SAFETY: the pointer is fetched first because `sqlite3_column_bytes`
        // must follow any conversion `sqlite3_column_blob` performs; the bytes
        // are copied before the statement can move on.
        unsafe {
            let ptr = sqlite3_column_blob(self.ptr, idx);
            let len = sqlite3_column_bytes(self.ptr, idx);
            if ptr.is_null() || len <= 0 {
                return Vec::new();
            }
            let len = usize::try_from(len).unwrap_or(0);
            std::slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec()
        }
    }

    /// Copy of the column's text, `None` for NULL.
    pub fn column_text(&self, idx: c_int) -> Option<String> {
        // SAFETY: as for `column_blob`; length-delimited so embedded NULs
        // survive.
        unsafe {
            let ptr = sqlite3_column_text(self.ptr, idx);
            if ptr.is_null() {
                return None;
            }
            let len = usize::try_from(sqlite3_column_bytes(self.ptr, idx)).unwrap_or(0);
            let bytes = std::slice::from_raw_parts(ptr.cast::<u8>(), len);
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    fn check(&self, rc: c_int) -> DbResult<()> {
        if rc == SQLITE_OK {
            Ok(())
        } else {
            Err(self.error(rc))
        }
    }

    fn error(&self, rc: c_int) -> DbError {
        DbError::new(rc, errmsg_of(self.db))
    }
}

impl std::fmt::Debug for RawStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawStmt").field(&self.ptr).finish()
    }
}

impl Drop for RawStmt {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: the handle is still owned by this value.
            unsafe {
                sqlite3_finalize(self.ptr);
            }
        }
    }
}
