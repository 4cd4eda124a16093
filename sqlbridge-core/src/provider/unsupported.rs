//! Native API members the sandbox build does not carry.
//!
//! They are declared so callers written against the full API still compile,
//! and each fails at once with [`BridgeError::Unsupported`] naming the
//! member. None of them reaches the sandbox.

use std::cmp::Ordering;

use log::error;
use sqlbridge_db::{ResultCode, Value};

use super::{ApiMember, Provider};
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{ConnectionHandle, StatementHandle};
use crate::sandbox::Sandbox;

/// Body of a user-defined scalar function.
pub type ScalarFunction = Box<dyn FnMut(&[Value]) -> Value + Send>;

/// Comparison used by a user-defined collation.
pub type Collation = Box<dyn Fn(&str, &str) -> Ordering + Send>;

/// Row-change notification: operation code, database, table, rowid.
pub type UpdateCallback = Box<dyn FnMut(i32, &str, &str, i64) + Send>;

/// Access check: action code and up to four detail strings, returns a
/// native authorizer verdict.
pub type AuthorizerCallback =
    Box<dyn FnMut(i32, Option<&str>, Option<&str>, Option<&str>, Option<&str>) -> i32 + Send>;

fn unsupported<T>(member: ApiMember) -> BridgeResult<T> {
    error!("{} is not supported in this environment", member.symbol());
    Err(BridgeError::Unsupported(member))
}

impl<S: Sandbox> Provider<S> {
    // ── Statements ──────────────────────────────────────────────────────

    /// Runs SQL without a statement handle. Use prepare/step/finalize.
    ///
    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn exec(&mut self, _db: ConnectionHandle, _sql: &str) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::Exec)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn prepare_v3(
        &mut self,
        _db: ConnectionHandle,
        _sql: &str,
        _flags: u32,
    ) -> BridgeResult<StatementHandle> {
        unsupported(ApiMember::PrepareV3)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn clear_bindings(&mut self, _stmt: StatementHandle) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::ClearBindings)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn bind_zeroblob(
        &mut self,
        _stmt: StatementHandle,
        _index: i32,
        _len: i32,
    ) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::BindZeroblob)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn bind_parameter_name(
        &mut self,
        _stmt: StatementHandle,
        _index: i32,
    ) -> BridgeResult<Option<String>> {
        unsupported(ApiMember::BindParameterName)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn column_decltype(
        &mut self,
        _stmt: StatementHandle,
        _column: i32,
    ) -> BridgeResult<Option<String>> {
        unsupported(ApiMember::ColumnDecltype)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn column_table_name(
        &mut self,
        _stmt: StatementHandle,
        _column: i32,
    ) -> BridgeResult<Option<String>> {
        unsupported(ApiMember::ColumnTableName)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn column_origin_name(
        &mut self,
        _stmt: StatementHandle,
        _column: i32,
    ) -> BridgeResult<Option<String>> {
        unsupported(ApiMember::ColumnOriginName)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn column_database_name(
        &mut self,
        _stmt: StatementHandle,
        _column: i32,
    ) -> BridgeResult<Option<String>> {
        unsupported(ApiMember::ColumnDatabaseName)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn data_count(&mut self, _stmt: StatementHandle) -> BridgeResult<i32> {
        unsupported(ApiMember::DataCount)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn sql(&mut self, _stmt: StatementHandle) -> BridgeResult<String> {
        unsupported(ApiMember::Sql)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn expanded_sql(&mut self, _stmt: StatementHandle) -> BridgeResult<String> {
        unsupported(ApiMember::ExpandedSql)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn stmt_readonly(&mut self, _stmt: StatementHandle) -> BridgeResult<bool> {
        unsupported(ApiMember::StmtReadonly)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn stmt_busy(&mut self, _stmt: StatementHandle) -> BridgeResult<bool> {
        unsupported(ApiMember::StmtBusy)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn next_stmt(
        &mut self,
        _db: ConnectionHandle,
        _after: Option<StatementHandle>,
    ) -> BridgeResult<Option<StatementHandle>> {
        unsupported(ApiMember::NextStmt)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn db_handle(&mut self, _stmt: StatementHandle) -> BridgeResult<ConnectionHandle> {
        unsupported(ApiMember::DbHandle)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn stmt_status(
        &mut self,
        _stmt: StatementHandle,
        _op: i32,
        _reset: bool,
    ) -> BridgeResult<i32> {
        unsupported(ApiMember::StmtStatus)
    }

    // ── Connection introspection and control ────────────────────────────

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn db_filename(&mut self, _db: ConnectionHandle, _schema: &str) -> BridgeResult<String> {
        unsupported(ApiMember::DbFilename)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn db_readonly(&mut self, _db: ConnectionHandle, _schema: &str) -> BridgeResult<bool> {
        unsupported(ApiMember::DbReadonly)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn extended_errcode(&mut self, _db: ConnectionHandle) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::ExtendedErrcode)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn extended_result_codes(
        &mut self,
        _db: ConnectionHandle,
        _on: bool,
    ) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::ExtendedResultCodes)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn interrupt(&mut self, _db: ConnectionHandle) -> BridgeResult<()> {
        unsupported(ApiMember::Interrupt)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn db_config(&mut self, _db: ConnectionHandle, _op: i32) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::DbConfig)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn limit(&mut self, _db: ConnectionHandle, _id: i32, _value: i32) -> BridgeResult<i32> {
        unsupported(ApiMember::Limit)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn db_status(
        &mut self,
        _db: ConnectionHandle,
        _op: i32,
        _reset: bool,
    ) -> BridgeResult<(i32, i32)> {
        unsupported(ApiMember::DbStatus)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn table_column_metadata(
        &mut self,
        _db: ConnectionHandle,
        _schema: Option<&str>,
        _table: &str,
        _column: &str,
    ) -> BridgeResult<(String, String, bool, bool, bool)> {
        unsupported(ApiMember::TableColumnMetadata)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn key(&mut self, _db: ConnectionHandle, _key: &[u8]) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::Key)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn rekey(&mut self, _db: ConnectionHandle, _key: &[u8]) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::Rekey)
    }

    // ── Library-wide ────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn errstr(&mut self, _code: ResultCode) -> BridgeResult<String> {
        unsupported(ApiMember::Errstr)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn complete(&mut self, _sql: &str) -> BridgeResult<bool> {
        unsupported(ApiMember::Complete)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn sourceid(&mut self) -> BridgeResult<String> {
        unsupported(ApiMember::Sourceid)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn libversion(&mut self) -> BridgeResult<String> {
        unsupported(ApiMember::Libversion)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn threadsafe(&mut self) -> BridgeResult<i32> {
        unsupported(ApiMember::Threadsafe)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn compileoption_used(&mut self, _option: &str) -> BridgeResult<bool> {
        unsupported(ApiMember::CompileoptionUsed)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn compileoption_get(&mut self, _n: i32) -> BridgeResult<Option<String>> {
        unsupported(ApiMember::CompileoptionGet)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn config(&mut self, _op: i32) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::Config)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn shutdown(&mut self) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::Shutdown)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn status(&mut self, _op: i32, _reset: bool) -> BridgeResult<(i64, i64)> {
        unsupported(ApiMember::Status)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn memory_used(&mut self) -> BridgeResult<i64> {
        unsupported(ApiMember::MemoryUsed)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn memory_highwater(&mut self, _reset: bool) -> BridgeResult<i64> {
        unsupported(ApiMember::MemoryHighwater)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn soft_heap_limit(&mut self, _limit: i64) -> BridgeResult<i64> {
        unsupported(ApiMember::SoftHeapLimit)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn enable_shared_cache(&mut self, _on: bool) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::EnableSharedCache)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn win32_set_directory(&mut self, _kind: u32, _path: &str) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::Win32SetDirectory)
    }

    // ── Backup ──────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn backup_init(
        &mut self,
        _dest: ConnectionHandle,
        _dest_name: &str,
        _source: ConnectionHandle,
        _source_name: &str,
    ) -> BridgeResult<u32> {
        unsupported(ApiMember::BackupInit)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn backup_step(&mut self, _backup: u32, _pages: i32) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::BackupStep)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn backup_finish(&mut self, _backup: u32) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::BackupFinish)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn backup_remaining(&mut self, _backup: u32) -> BridgeResult<i32> {
        unsupported(ApiMember::BackupRemaining)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn backup_pagecount(&mut self, _backup: u32) -> BridgeResult<i32> {
        unsupported(ApiMember::BackupPagecount)
    }

    // ── Incremental blob I/O ────────────────────────────────────────────

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn blob_open(
        &mut self,
        _db: ConnectionHandle,
        _schema: &str,
        _table: &str,
        _column: &str,
        _rowid: i64,
        _writable: bool,
    ) -> BridgeResult<u32> {
        unsupported(ApiMember::BlobOpen)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn blob_read(&mut self, _blob: u32, _buf: &mut [u8], _offset: i32) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::BlobRead)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn blob_write(&mut self, _blob: u32, _data: &[u8], _offset: i32) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::BlobWrite)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn blob_bytes(&mut self, _blob: u32) -> BridgeResult<i32> {
        unsupported(ApiMember::BlobBytes)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn blob_reopen(&mut self, _blob: u32, _rowid: i64) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::BlobReopen)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn blob_close(&mut self, _blob: u32) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::BlobClose)
    }

    // ── User-defined functions and callbacks ────────────────────────────

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn create_function(
        &mut self,
        _db: ConnectionHandle,
        _name: &str,
        _n_args: i32,
        _function: ScalarFunction,
    ) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::CreateFunction)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn create_collation(
        &mut self,
        _db: ConnectionHandle,
        _name: &str,
        _compare: Collation,
    ) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::CreateCollation)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn commit_hook(
        &mut self,
        _db: ConnectionHandle,
        _hook: Box<dyn FnMut() -> bool + Send>,
    ) -> BridgeResult<()> {
        unsupported(ApiMember::CommitHook)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn rollback_hook(
        &mut self,
        _db: ConnectionHandle,
        _hook: Box<dyn FnMut() + Send>,
    ) -> BridgeResult<()> {
        unsupported(ApiMember::RollbackHook)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn update_hook(&mut self, _db: ConnectionHandle, _hook: UpdateCallback) -> BridgeResult<()> {
        unsupported(ApiMember::UpdateHook)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn wal_hook(
        &mut self,
        _db: ConnectionHandle,
        _hook: Box<dyn FnMut(&str, i32) -> ResultCode + Send>,
    ) -> BridgeResult<()> {
        unsupported(ApiMember::WalHook)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn trace(
        &mut self,
        _db: ConnectionHandle,
        _callback: Box<dyn FnMut(&str) + Send>,
    ) -> BridgeResult<()> {
        unsupported(ApiMember::Trace)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn profile(
        &mut self,
        _db: ConnectionHandle,
        _callback: Box<dyn FnMut(&str, u64) + Send>,
    ) -> BridgeResult<()> {
        unsupported(ApiMember::Profile)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn progress_handler(
        &mut self,
        _db: ConnectionHandle,
        _instructions: i32,
        _handler: Box<dyn FnMut() -> bool + Send>,
    ) -> BridgeResult<()> {
        unsupported(ApiMember::ProgressHandler)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn set_authorizer(
        &mut self,
        _db: ConnectionHandle,
        _authorizer: AuthorizerCallback,
    ) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::SetAuthorizer)
    }

    // ── WAL and extensions ──────────────────────────────────────────────

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn wal_checkpoint(
        &mut self,
        _db: ConnectionHandle,
        _schema: Option<&str>,
    ) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::WalCheckpoint)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn wal_autocheckpoint(&mut self, _db: ConnectionHandle, _pages: i32) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::WalAutocheckpoint)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn enable_load_extension(&mut self, _db: ConnectionHandle, _on: bool) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::EnableLoadExtension)
    }

    /// # Errors
    ///
    /// Always fails with [`BridgeError::Unsupported`].
    pub fn load_extension(
        &mut self,
        _db: ConnectionHandle,
        _file: &str,
        _entry_point: Option<&str>,
    ) -> BridgeResult<ResultCode> {
        unsupported(ApiMember::LoadExtension)
    }
}
