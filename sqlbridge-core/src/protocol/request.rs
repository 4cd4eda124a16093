//! Typed calls: the closed set of operations, decoded once at the boundary.

use super::envelope::{Arg, Call};
use super::{Command, ProtocolError};
use crate::handle::{ConnectionHandle, StatementHandle};
use crate::memory::Addr;

/// A side-channel block reference: address plus length in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    /// Block address.
    pub addr: Addr,
    /// Length in bytes.
    pub len: usize,
}

/// One call into the sandbox with typed arguments.
///
/// Parameter indices are 1-based and column indices 0-based, as in the
/// native API. Both are carried as `i32` so the sandbox sees exactly what
/// the caller passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Open a database, optionally seeded from a pinned image.
    Open {
        /// Storage name the image belongs to.
        name: String,
        /// Serialized image, `None` for a fresh database.
        image: Option<BlockRef>,
        /// Native open flags.
        flags: i32,
    },
    /// Close a database, writing its image back when `flush` is set.
    Close {
        /// Connection to close.
        db: ConnectionHandle,
        /// Persist a changed image to storage.
        flush: bool,
    },
    /// Set the busy timeout.
    BusyTimeout {
        /// Target connection.
        db: ConnectionHandle,
        /// Timeout in milliseconds.
        ms: i32,
    },
    /// Engine version number.
    LibversionNumber,
    /// Rows changed by the last statement.
    Changes {
        /// Target connection.
        db: ConnectionHandle,
    },
    /// Rows changed since open.
    TotalChanges {
        /// Target connection.
        db: ConnectionHandle,
    },
    /// Rowid of the last insert.
    LastInsertRowid {
        /// Target connection.
        db: ConnectionHandle,
    },
    /// Last error message.
    Errmsg {
        /// Target connection.
        db: ConnectionHandle,
    },
    /// Last error code.
    Errcode {
        /// Target connection.
        db: ConnectionHandle,
    },
    /// Prepare one statement.
    Prepare2 {
        /// Target connection.
        db: ConnectionHandle,
        /// SQL text.
        sql: String,
    },
    /// Advance a statement.
    Step {
        /// Target statement.
        stmt: StatementHandle,
    },
    /// Rewind a statement.
    Reset {
        /// Target statement.
        stmt: StatementHandle,
    },
    /// Destroy a statement.
    Finalize {
        /// Target statement.
        stmt: StatementHandle,
    },
    /// Number of parameters.
    BindParameterCount {
        /// Target statement.
        stmt: StatementHandle,
    },
    /// Index of a named parameter.
    BindParameterIndex {
        /// Target statement.
        stmt: StatementHandle,
        /// Parameter name including its prefix character.
        name: String,
    },
    /// Bind SQL NULL.
    BindNull {
        /// Target statement.
        stmt: StatementHandle,
        /// Parameter index.
        index: i32,
    },
    /// Bind a 32-bit integer.
    BindInt {
        /// Target statement.
        stmt: StatementHandle,
        /// Parameter index.
        index: i32,
        /// Value.
        value: i32,
    },
    /// Bind a 64-bit integer read from an 8-byte inbound block.
    BindInt64 {
        /// Target statement.
        stmt: StatementHandle,
        /// Parameter index.
        index: i32,
        /// Block holding the value.
        value: Addr,
    },
    /// Bind a double read from an 8-byte inbound block.
    BindDouble {
        /// Target statement.
        stmt: StatementHandle,
        /// Parameter index.
        index: i32,
        /// Block holding the value.
        value: Addr,
    },
    /// Bind text.
    BindText {
        /// Target statement.
        stmt: StatementHandle,
        /// Parameter index.
        index: i32,
        /// Value.
        text: String,
    },
    /// Bind a blob read from an inbound block.
    BindBlob {
        /// Target statement.
        stmt: StatementHandle,
        /// Parameter index.
        index: i32,
        /// Block holding the bytes.
        blob: BlockRef,
    },
    /// Number of result columns.
    ColumnCount {
        /// Target statement.
        stmt: StatementHandle,
    },
    /// Name of a result column.
    ColumnName {
        /// Target statement.
        stmt: StatementHandle,
        /// Column index.
        column: i32,
    },
    /// Storage class of a result column.
    ColumnType {
        /// Target statement.
        stmt: StatementHandle,
        /// Column index.
        column: i32,
    },
    /// Column value as text.
    ColumnText {
        /// Target statement.
        stmt: StatementHandle,
        /// Column index.
        column: i32,
    },
    /// Column value as a 32-bit integer.
    ColumnInt {
        /// Target statement.
        stmt: StatementHandle,
        /// Column index.
        column: i32,
    },
    /// Column value as a 64-bit integer, written to an 8-byte outbound block.
    ColumnInt64 {
        /// Target statement.
        stmt: StatementHandle,
        /// Column index.
        column: i32,
        /// Block receiving the value.
        out: Addr,
    },
    /// Column value as a double, written to an 8-byte outbound block.
    ColumnDouble {
        /// Target statement.
        stmt: StatementHandle,
        /// Column index.
        column: i32,
        /// Block receiving the value.
        out: Addr,
    },
    /// Byte length of a text or blob column.
    ColumnBytes {
        /// Target statement.
        stmt: StatementHandle,
        /// Column index.
        column: i32,
    },
    /// Column value as a blob, written to an outbound block of exact length.
    ColumnBlob {
        /// Target statement.
        stmt: StatementHandle,
        /// Column index.
        column: i32,
        /// Block receiving the bytes.
        out: BlockRef,
    },
}

impl Request {
    /// The wire name of this request.
    #[must_use]
    pub const fn command(&self) -> Command {
        match self {
            Self::Open { .. } => Command::Open,
            Self::Close { .. } => Command::Close,
            Self::BusyTimeout { .. } => Command::BusyTimeout,
            Self::LibversionNumber => Command::LibversionNumber,
            Self::Changes { .. } => Command::Changes,
            Self::TotalChanges { .. } => Command::TotalChanges,
            Self::LastInsertRowid { .. } => Command::LastInsertRowid,
            Self::Errmsg { .. } => Command::Errmsg,
            Self::Errcode { .. } => Command::Errcode,
            Self::Prepare2 { .. } => Command::Prepare2,
            Self::Step { .. } => Command::Step,
            Self::Reset { .. } => Command::Reset,
            Self::Finalize { .. } => Command::Finalize,
            Self::BindParameterCount { .. } => Command::BindParameterCount,
            Self::BindParameterIndex { .. } => Command::BindParameterIndex,
            Self::BindNull { .. } => Command::BindNull,
            Self::BindInt { .. } => Command::BindInt,
            Self::BindInt64 { .. } => Command::BindInt64,
            Self::BindDouble { .. } => Command::BindDouble,
            Self::BindText { .. } => Command::BindText,
            Self::BindBlob { .. } => Command::BindBlob,
            Self::ColumnCount { .. } => Command::ColumnCount,
            Self::ColumnName { .. } => Command::ColumnName,
            Self::ColumnType { .. } => Command::ColumnType,
            Self::ColumnText { .. } => Command::ColumnText,
            Self::ColumnInt { .. } => Command::ColumnInt,
            Self::ColumnInt64 { .. } => Command::ColumnInt64,
            Self::ColumnDouble { .. } => Command::ColumnDouble,
            Self::ColumnBytes { .. } => Command::ColumnBytes,
            Self::ColumnBlob { .. } => Command::ColumnBlob,
        }
    }

    /// Renders the call envelope.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_call().encode()
    }

    /// Parses and types a call envelope.
    pub fn decode(input: &str) -> Result<Self, ProtocolError> {
        Self::from_call(Call::decode(input)?)
    }

    /// Lowers the request to untyped arguments.
    #[must_use]
    pub fn to_call(&self) -> Call {
        let args = match self {
            Self::Open { name, image, flags } => {
                let (addr, len) = match image {
                    Some(block) => (Arg::Addr(block.addr), len_arg(block.len)),
                    None => (Arg::Null, Arg::Int(0)),
                };
                vec![Arg::Text(name.clone()), addr, len, Arg::Int((*flags).into())]
            }
            Self::Close { db, flush } => vec![db_arg(*db), Arg::Int(i64::from(*flush))],
            Self::BusyTimeout { db, ms } => vec![db_arg(*db), Arg::Int((*ms).into())],
            Self::LibversionNumber => Vec::new(),
            Self::Changes { db }
            | Self::TotalChanges { db }
            | Self::LastInsertRowid { db }
            | Self::Errmsg { db }
            | Self::Errcode { db } => vec![db_arg(*db)],
            Self::Prepare2 { db, sql } => vec![db_arg(*db), Arg::Text(sql.clone())],
            Self::Step { stmt }
            | Self::Reset { stmt }
            | Self::Finalize { stmt }
            | Self::BindParameterCount { stmt }
            | Self::ColumnCount { stmt } => vec![stmt_arg(*stmt)],
            Self::BindParameterIndex { stmt, name } => {
                vec![stmt_arg(*stmt), Arg::Text(name.clone())]
            }
            Self::BindNull { stmt, index } => vec![stmt_arg(*stmt), Arg::Int((*index).into())],
            Self::BindInt { stmt, index, value } => vec![
                stmt_arg(*stmt),
                Arg::Int((*index).into()),
                Arg::Int((*value).into()),
            ],
            Self::BindInt64 { stmt, index, value } | Self::BindDouble { stmt, index, value } => {
                vec![stmt_arg(*stmt), Arg::Int((*index).into()), Arg::Addr(*value)]
            }
            Self::BindText { stmt, index, text } => vec![
                stmt_arg(*stmt),
                Arg::Int((*index).into()),
                Arg::Text(text.clone()),
            ],
            Self::BindBlob { stmt, index, blob } => vec![
                stmt_arg(*stmt),
                Arg::Int((*index).into()),
                Arg::Addr(blob.addr),
                len_arg(blob.len),
            ],
            Self::ColumnName { stmt, column }
            | Self::ColumnType { stmt, column }
            | Self::ColumnText { stmt, column }
            | Self::ColumnInt { stmt, column }
            | Self::ColumnBytes { stmt, column } => {
                vec![stmt_arg(*stmt), Arg::Int((*column).into())]
            }
            Self::ColumnInt64 { stmt, column, out } | Self::ColumnDouble { stmt, column, out } => {
                vec![stmt_arg(*stmt), Arg::Int((*column).into()), Arg::Addr(*out)]
            }
            Self::ColumnBlob { stmt, column, out } => vec![
                stmt_arg(*stmt),
                Arg::Int((*column).into()),
                Arg::Addr(out.addr),
                len_arg(out.len),
            ],
        };
        Call::new(self.command(), args)
    }

    /// Types an untyped call, checking arity and every argument.
    pub fn from_call(call: Call) -> Result<Self, ProtocolError> {
        let command = call.command;
        let expected = command.arity();
        if call.args.len() != expected {
            return Err(ProtocolError::Arity {
                command,
                expected,
                found: call.args.len(),
            });
        }
        let mut a = Args {
            command,
            args: call.args.into_iter(),
            position: 0,
        };
        let request = match command {
            Command::Open => {
                let name = a.text()?;
                let addr = a.addr_or_null()?;
                let len = a.len()?;
                let flags = a.int32()?;
                let image = addr.map(|addr| BlockRef { addr, len });
                Self::Open { name, image, flags }
            }
            Command::Close => Self::Close {
                db: a.db()?,
                flush: a.int()? != 0,
            },
            Command::BusyTimeout => Self::BusyTimeout {
                db: a.db()?,
                ms: a.int32()?,
            },
            Command::LibversionNumber => Self::LibversionNumber,
            Command::Changes => Self::Changes { db: a.db()? },
            Command::TotalChanges => Self::TotalChanges { db: a.db()? },
            Command::LastInsertRowid => Self::LastInsertRowid { db: a.db()? },
            Command::Errmsg => Self::Errmsg { db: a.db()? },
            Command::Errcode => Self::Errcode { db: a.db()? },
            Command::Prepare2 => Self::Prepare2 {
                db: a.db()?,
                sql: a.text()?,
            },
            Command::Step => Self::Step { stmt: a.stmt()? },
            Command::Reset => Self::Reset { stmt: a.stmt()? },
            Command::Finalize => Self::Finalize { stmt: a.stmt()? },
            Command::BindParameterCount => Self::BindParameterCount { stmt: a.stmt()? },
            Command::BindParameterIndex => Self::BindParameterIndex {
                stmt: a.stmt()?,
                name: a.text()?,
            },
            Command::BindNull => Self::BindNull {
                stmt: a.stmt()?,
                index: a.int32()?,
            },
            Command::BindInt => Self::BindInt {
                stmt: a.stmt()?,
                index: a.int32()?,
                value: a.int32()?,
            },
            Command::BindInt64 => Self::BindInt64 {
                stmt: a.stmt()?,
                index: a.int32()?,
                value: a.addr()?,
            },
            Command::BindDouble => Self::BindDouble {
                stmt: a.stmt()?,
                index: a.int32()?,
                value: a.addr()?,
            },
            Command::BindText => Self::BindText {
                stmt: a.stmt()?,
                index: a.int32()?,
                text: a.text()?,
            },
            Command::BindBlob => Self::BindBlob {
                stmt: a.stmt()?,
                index: a.int32()?,
                blob: a.block()?,
            },
            Command::ColumnCount => Self::ColumnCount { stmt: a.stmt()? },
            Command::ColumnName => Self::ColumnName {
                stmt: a.stmt()?,
                column: a.int32()?,
            },
            Command::ColumnType => Self::ColumnType {
                stmt: a.stmt()?,
                column: a.int32()?,
            },
            Command::ColumnText => Self::ColumnText {
                stmt: a.stmt()?,
                column: a.int32()?,
            },
            Command::ColumnInt => Self::ColumnInt {
                stmt: a.stmt()?,
                column: a.int32()?,
            },
            Command::ColumnInt64 => Self::ColumnInt64 {
                stmt: a.stmt()?,
                column: a.int32()?,
                out: a.addr()?,
            },
            Command::ColumnDouble => Self::ColumnDouble {
                stmt: a.stmt()?,
                column: a.int32()?,
                out: a.addr()?,
            },
            Command::ColumnBytes => Self::ColumnBytes {
                stmt: a.stmt()?,
                column: a.int32()?,
            },
            Command::ColumnBlob => Self::ColumnBlob {
                stmt: a.stmt()?,
                column: a.int32()?,
                out: a.block()?,
            },
        };
        Ok(request)
    }
}

fn db_arg(db: ConnectionHandle) -> Arg {
    Arg::Int(db.get().into())
}

fn stmt_arg(stmt: StatementHandle) -> Arg {
    Arg::Int(stmt.get().into())
}

fn len_arg(len: usize) -> Arg {
    Arg::Int(i64::try_from(len).unwrap_or(i64::MAX))
}

/// Positional argument reader that reports the offending position.
struct Args {
    command: Command,
    args: std::vec::IntoIter<Arg>,
    position: usize,
}

impl Args {
    fn next(&mut self, expected: &'static str) -> Result<Arg, ProtocolError> {
        let position = self.position;
        self.position += 1;
        self.args.next().ok_or(ProtocolError::ArgumentType {
            command: self.command,
            position,
            expected,
        })
    }

    fn mismatch(&self, expected: &'static str) -> ProtocolError {
        ProtocolError::ArgumentType {
            command: self.command,
            position: self.position - 1,
            expected,
        }
    }

    fn int(&mut self) -> Result<i64, ProtocolError> {
        match self.next("an integer")? {
            Arg::Int(v) => Ok(v),
            _ => Err(self.mismatch("an integer")),
        }
    }

    fn int32(&mut self) -> Result<i32, ProtocolError> {
        let v = self.int()?;
        i32::try_from(v).map_err(|_| self.mismatch("a 32-bit integer"))
    }

    fn len(&mut self) -> Result<usize, ProtocolError> {
        let v = self.int()?;
        usize::try_from(v).map_err(|_| self.mismatch("a non-negative length"))
    }

    fn handle(&mut self) -> Result<u32, ProtocolError> {
        let v = self.int()?;
        u32::try_from(v).map_err(|_| self.mismatch("a handle"))
    }

    fn db(&mut self) -> Result<ConnectionHandle, ProtocolError> {
        self.handle().map(ConnectionHandle::from_raw)
    }

    fn stmt(&mut self) -> Result<StatementHandle, ProtocolError> {
        self.handle().map(StatementHandle::from_raw)
    }

    fn text(&mut self) -> Result<String, ProtocolError> {
        match self.next("a string")? {
            Arg::Text(s) => Ok(s),
            _ => Err(self.mismatch("a string")),
        }
    }

    fn addr(&mut self) -> Result<Addr, ProtocolError> {
        match self.next("an address")? {
            Arg::Addr(a) => Ok(a),
            _ => Err(self.mismatch("an address")),
        }
    }

    fn addr_or_null(&mut self) -> Result<Option<Addr>, ProtocolError> {
        match self.next("an address or null")? {
            Arg::Addr(a) => Ok(Some(a)),
            Arg::Null => Ok(None),
            _ => Err(self.mismatch("an address or null")),
        }
    }

    fn block(&mut self) -> Result<BlockRef, ProtocolError> {
        let addr = self.addr()?;
        let len = self.len()?;
        Ok(BlockRef { addr, len })
    }
}
