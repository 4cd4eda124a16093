//! The closed set of operations the sandbox exports, one variant per
//! envelope name.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Operations the sandbox exports, named as they appear in call envelopes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// `open(name, image, image_len, flags)`
    Open,
    /// `close(db, flush)`
    Close,
    /// `busy_timeout(db, ms)`
    BusyTimeout,
    /// `libversion_number()`
    LibversionNumber,
    /// `changes(db)`
    Changes,
    /// `total_changes(db)`
    TotalChanges,
    /// `last_insert_rowid(db)`
    LastInsertRowid,
    /// `errmsg(db)`
    Errmsg,
    /// `errcode(db)`
    Errcode,
    /// `prepare2(db, sql)`
    #[strum(serialize = "prepare2")]
    Prepare2,
    /// `step(stmt)`
    Step,
    /// `reset(stmt)`
    Reset,
    /// `finalize(stmt)`
    Finalize,
    /// `bind_parameter_count(stmt)`
    BindParameterCount,
    /// `bind_parameter_index(stmt, name)`
    BindParameterIndex,
    /// `bind_null(stmt, index)`
    BindNull,
    /// `bind_int(stmt, index, value)`
    BindInt,
    /// `bind_int64(stmt, index, addr)`
    #[strum(serialize = "bind_int64")]
    BindInt64,
    /// `bind_double(stmt, index, addr)`
    BindDouble,
    /// `bind_text(stmt, index, text)`
    BindText,
    /// `bind_blob(stmt, index, addr, len)`
    BindBlob,
    /// `column_count(stmt)`
    ColumnCount,
    /// `column_name(stmt, column)`
    ColumnName,
    /// `column_type(stmt, column)`
    ColumnType,
    /// `column_text(stmt, column)`
    ColumnText,
    /// `column_int(stmt, column)`
    ColumnInt,
    /// `column_int64(stmt, column, addr)`
    #[strum(serialize = "column_int64")]
    ColumnInt64,
    /// `column_double(stmt, column, addr)`
    ColumnDouble,
    /// `column_bytes(stmt, column)`
    ColumnBytes,
    /// `column_blob(stmt, column, addr, len)`
    ColumnBlob,
}

impl Command {
    /// Number of arguments the command takes on the wire.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::LibversionNumber => 0,
            Self::Changes
            | Self::TotalChanges
            | Self::LastInsertRowid
            | Self::Errmsg
            | Self::Errcode
            | Self::Step
            | Self::Reset
            | Self::Finalize
            | Self::BindParameterCount
            | Self::ColumnCount => 1,
            Self::Close
            | Self::BusyTimeout
            | Self::Prepare2
            | Self::BindParameterIndex
            | Self::BindNull
            | Self::ColumnName
            | Self::ColumnType
            | Self::ColumnText
            | Self::ColumnInt
            | Self::ColumnBytes => 2,
            Self::BindInt
            | Self::BindInt64
            | Self::BindDouble
            | Self::BindText
            | Self::ColumnInt64
            | Self::ColumnDouble => 3,
            Self::Open | Self::BindBlob | Self::ColumnBlob => 4,
        }
    }
}
