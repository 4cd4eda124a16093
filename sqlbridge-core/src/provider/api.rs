//! The native API surface and which members the sandbox build carries.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// One member of the native `sqlite3_*` API.
///
/// Display renders the name without the `sqlite3_` prefix;
/// [`ApiMember::symbol`] gives the full native symbol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)]
pub enum ApiMember {
    // ── Connections ─────────────────────────────────────────────────────
    Open,
    #[strum(serialize = "open_v2")]
    OpenV2,
    Close,
    #[strum(serialize = "close_v2")]
    CloseV2,
    BusyTimeout,
    LibversionNumber,
    Changes,
    TotalChanges,
    LastInsertRowid,
    Errmsg,
    Errcode,

    // ── Statements ──────────────────────────────────────────────────────
    Prepare,
    #[strum(serialize = "prepare_v2")]
    PrepareV2,
    Step,
    Reset,
    Finalize,
    BindParameterCount,
    BindParameterIndex,
    BindNull,
    BindInt,
    #[strum(serialize = "bind_int64")]
    BindInt64,
    BindDouble,
    BindText,
    BindBlob,
    ColumnCount,
    ColumnName,
    ColumnType,
    ColumnText,
    ColumnInt,
    #[strum(serialize = "column_int64")]
    ColumnInt64,
    ColumnDouble,
    ColumnBytes,
    ColumnBlob,

    // ── Not carried by the sandbox build ────────────────────────────────
    #[strum(serialize = "prepare_v3")]
    PrepareV3,
    Exec,
    ClearBindings,
    BindZeroblob,
    BindParameterName,
    ColumnDecltype,
    ColumnTableName,
    ColumnOriginName,
    ColumnDatabaseName,
    DataCount,
    Sql,
    ExpandedSql,
    StmtReadonly,
    StmtBusy,
    NextStmt,
    DbHandle,
    DbFilename,
    DbReadonly,
    Errstr,
    ExtendedErrcode,
    ExtendedResultCodes,
    Interrupt,
    Complete,
    Sourceid,
    Libversion,
    Threadsafe,
    CompileoptionUsed,
    CompileoptionGet,
    Config,
    DbConfig,
    Limit,
    Shutdown,
    BackupInit,
    BackupStep,
    BackupFinish,
    BackupRemaining,
    BackupPagecount,
    BlobOpen,
    BlobRead,
    BlobWrite,
    BlobBytes,
    BlobReopen,
    BlobClose,
    CreateFunction,
    CreateCollation,
    CommitHook,
    RollbackHook,
    UpdateHook,
    Trace,
    Profile,
    ProgressHandler,
    SetAuthorizer,
    Status,
    DbStatus,
    StmtStatus,
    MemoryUsed,
    MemoryHighwater,
    SoftHeapLimit,
    TableColumnMetadata,
    WalCheckpoint,
    WalAutocheckpoint,
    WalHook,
    EnableLoadExtension,
    LoadExtension,
    EnableSharedCache,
    Key,
    Rekey,
    #[strum(serialize = "win32_set_directory")]
    Win32SetDirectory,
}

impl ApiMember {
    /// `true` when the member is routed through the sandbox.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Open
                | Self::OpenV2
                | Self::Close
                | Self::CloseV2
                | Self::BusyTimeout
                | Self::LibversionNumber
                | Self::Changes
                | Self::TotalChanges
                | Self::LastInsertRowid
                | Self::Errmsg
                | Self::Errcode
                | Self::Prepare
                | Self::PrepareV2
                | Self::Step
                | Self::Reset
                | Self::Finalize
                | Self::BindParameterCount
                | Self::BindParameterIndex
                | Self::BindNull
                | Self::BindInt
                | Self::BindInt64
                | Self::BindDouble
                | Self::BindText
                | Self::BindBlob
                | Self::ColumnCount
                | Self::ColumnName
                | Self::ColumnType
                | Self::ColumnText
                | Self::ColumnInt
                | Self::ColumnInt64
                | Self::ColumnDouble
                | Self::ColumnBytes
                | Self::ColumnBlob
        )
    }

    /// The native symbol, e.g. `sqlite3_backup_init`.
    #[must_use]
    pub fn symbol(self) -> String {
        format!("sqlite3_{self}")
    }
}
