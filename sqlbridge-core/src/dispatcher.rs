//! Sandbox-side executor.
//!
//! The dispatcher owns every live engine object. It decodes a call envelope,
//! resolves handles through its registries, invokes the engine and renders
//! the reply. Databases live in memory: `open` deserializes the image the
//! host pinned, and `close` serializes the database and writes it back to
//! the [`ImageStore`] when its contents changed.

use std::sync::Arc;

use log::{debug, error, warn};
use sha2::{Digest, Sha256};
use sqlbridge_db::{
    libversion_number, Connection, DbError, DbResult, ResultCode, Statement, Value,
};

use crate::config::{BridgeConfig, OpenMode};
use crate::handle::{ConnectionHandle, StatementHandle};
use crate::memory::{HostMemory, MemoryError};
use crate::protocol::{Reply, Request};
use crate::registry::{FileTable, HandleRegistry};
use crate::sandbox::Sandbox;
use crate::storage::ImageStore;

type ImageDigest = [u8; 32];

fn digest(image: &[u8]) -> ImageDigest {
    Sha256::digest(image).into()
}

struct Session {
    conn: Connection,
    /// Digest of the image as loaded; a close with the same digest skips the
    /// write-back.
    baseline: ImageDigest,
    read_only: bool,
}

struct LiveStatement {
    stmt: Statement,
    db: ConnectionHandle,
}

/// A handle lookup that missed.
struct Unknown(&'static str, u32);

impl Unknown {
    fn describe(&self) -> String {
        let description = format!("unknown {} handle {}", self.0, self.1);
        warn!("{description}");
        description
    }

    /// Reply for status-returning calls, the native API's `SQLITE_MISUSE`.
    fn status(self) -> Reply {
        self.describe();
        Reply::Code(ResultCode::MISUSE)
    }

    /// Reply for calls that would have created a handle.
    fn pair(self) -> Reply {
        self.describe();
        Reply::Pair(ResultCode::MISUSE, 0)
    }

    /// Reply for value-returning calls, which have no status to carry it.
    fn fault(self) -> Reply {
        Reply::Fault(self.describe())
    }
}

fn engine_error(e: &DbError) -> Reply {
    debug!("engine error {}: {}", e.code, e.message);
    Reply::Code(e.code)
}

fn status<T>(result: DbResult<T>) -> Reply {
    match result {
        Ok(_) => Reply::Code(ResultCode::OK),
        Err(e) => engine_error(&e),
    }
}

fn memory_fault(err: &MemoryError) -> Reply {
    warn!("side channel access failed: {err}");
    Reply::Fault(err.to_string())
}

fn count(n: usize) -> Reply {
    Reply::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Maps a 1-based parameter index from the wire; negative indices never name
/// a parameter.
fn parameter(index: i32) -> usize {
    usize::try_from(index).unwrap_or(0)
}

/// Maps a 0-based column index from the wire; negative indices are out of
/// range.
fn column(index: i32) -> usize {
    usize::try_from(index).unwrap_or(usize::MAX)
}

/// Executes decoded calls against the engine.
pub struct Dispatcher {
    connections: HandleRegistry<ConnectionHandle, Session>,
    statements: HandleRegistry<StatementHandle, LiveStatement>,
    files: FileTable,
    store: Arc<dyn ImageStore>,
    verify_images: bool,
}

impl Dispatcher {
    /// Creates a dispatcher writing images back to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ImageStore>) -> Self {
        Self::with_config(store, &BridgeConfig::default())
    }

    /// Creates a dispatcher with explicit settings.
    #[must_use]
    pub fn with_config(store: Arc<dyn ImageStore>, config: &BridgeConfig) -> Self {
        Self {
            connections: HandleRegistry::new(),
            statements: HandleRegistry::new(),
            files: FileTable::new(),
            store,
            verify_images: config.verify_images,
        }
    }

    /// Number of open connections.
    #[must_use]
    pub const fn live_connections(&self) -> usize {
        self.connections.len()
    }

    /// Number of live prepared statements.
    #[must_use]
    pub const fn live_statements(&self) -> usize {
        self.statements.len()
    }

    /// Storage name recorded for an open connection.
    #[must_use]
    pub fn file_name(&self, db: ConnectionHandle) -> Option<&str> {
        self.files.get(db)
    }

    /// Executes one decoded request.
    pub fn dispatch(&mut self, request: Request, memory: &mut HostMemory) -> Reply {
        match request {
            Request::Open { name, image, flags } => {
                let image = match image {
                    Some(block) => match memory.read(block.addr, block.len) {
                        Ok(bytes) => Some(bytes),
                        Err(e) => return memory_fault(&e),
                    },
                    None => None,
                };
                self.open(name, image, OpenMode::from_flags(flags))
            }
            Request::Close { db, flush } => self.close(db, flush),
            Request::BusyTimeout { db, ms } => match self.connection(db) {
                Ok(session) => status(session.conn.busy_timeout(ms)),
                Err(unknown) => unknown.status(),
            },
            Request::LibversionNumber => Reply::Int(libversion_number().into()),
            Request::Changes { db } => match self.connection(db) {
                Ok(session) => count(session.conn.changes()),
                Err(unknown) => unknown.fault(),
            },
            Request::TotalChanges { db } => match self.connection(db) {
                Ok(session) => count(session.conn.total_changes()),
                Err(unknown) => unknown.fault(),
            },
            Request::LastInsertRowid { db } => match self.connection(db) {
                Ok(session) => Reply::Int(session.conn.last_insert_rowid()),
                Err(unknown) => unknown.fault(),
            },
            Request::Errmsg { db } => match self.connection(db) {
                Ok(session) => Reply::Text(Some(session.conn.errmsg())),
                Err(unknown) => unknown.fault(),
            },
            Request::Errcode { db } => match self.connection(db) {
                Ok(session) => Reply::Code(ResultCode(session.conn.errcode())),
                Err(unknown) => unknown.status(),
            },
            Request::Prepare2 { db, sql } => self.prepare(db, &sql),
            Request::Step { stmt } => match self.statement_mut(stmt) {
                Ok(p) => match p.stmt.step() {
                    Ok(step) => Reply::Code(step.code()),
                    Err(e) => engine_error(&e),
                },
                Err(unknown) => unknown.status(),
            },
            Request::Reset { stmt } => match self.statement_mut(stmt) {
                Ok(p) => status(p.stmt.reset()),
                Err(unknown) => unknown.status(),
            },
            Request::Finalize { stmt } => self.finalize(stmt),
            Request::BindParameterCount { stmt } => match self.statement(stmt) {
                Ok(p) => count(p.stmt.bind_parameter_count()),
                Err(unknown) => unknown.fault(),
            },
            Request::BindParameterIndex { stmt, name } => match self.statement(stmt) {
                Ok(p) => count(p.stmt.bind_parameter_index(&name)),
                Err(unknown) => unknown.fault(),
            },
            Request::BindNull { stmt, index } => self.bind(stmt, index, &Value::Null),
            Request::BindInt { stmt, index, value } => match self.statement_mut(stmt) {
                Ok(p) => status(p.stmt.bind_int(parameter(index), value)),
                Err(unknown) => unknown.status(),
            },
            Request::BindInt64 { stmt, index, value } => match memory.read_i64(value) {
                Ok(v) => self.bind(stmt, index, &Value::Integer(v)),
                Err(e) => memory_fault(&e),
            },
            Request::BindDouble { stmt, index, value } => match memory.read_f64(value) {
                Ok(v) => self.bind(stmt, index, &Value::Real(v)),
                Err(e) => memory_fault(&e),
            },
            Request::BindText { stmt, index, text } => {
                self.bind(stmt, index, &Value::Text(text))
            }
            Request::BindBlob { stmt, index, blob } => match memory.read(blob.addr, blob.len) {
                Ok(bytes) => self.bind(stmt, index, &Value::Blob(bytes.to_vec())),
                Err(e) => memory_fault(&e),
            },
            Request::ColumnCount { stmt } => match self.statement(stmt) {
                Ok(p) => count(p.stmt.column_count()),
                Err(unknown) => unknown.fault(),
            },
            Request::ColumnName { stmt, column: c } => match self.statement(stmt) {
                Ok(p) => Reply::Text(p.stmt.column_name(column(c))),
                Err(unknown) => unknown.fault(),
            },
            Request::ColumnType { stmt, column: c } => match self.statement(stmt) {
                Ok(p) => Reply::Int(p.stmt.column_type(column(c)).code().into()),
                Err(unknown) => unknown.fault(),
            },
            Request::ColumnText { stmt, column: c } => match self.statement(stmt) {
                Ok(p) => Reply::Text(p.stmt.column_optional_text(column(c))),
                Err(unknown) => unknown.fault(),
            },
            Request::ColumnInt { stmt, column: c } => match self.statement(stmt) {
                Ok(p) => Reply::Int(p.stmt.column_int(column(c)).into()),
                Err(unknown) => unknown.fault(),
            },
            Request::ColumnInt64 { stmt, column: c, out } => match self.statement(stmt) {
                Ok(p) => match memory.write_i64(out, p.stmt.column_i64(column(c))) {
                    Ok(()) => Reply::Code(ResultCode::OK),
                    Err(e) => memory_fault(&e),
                },
                Err(unknown) => unknown.status(),
            },
            Request::ColumnDouble { stmt, column: c, out } => match self.statement(stmt) {
                Ok(p) => match memory.write_f64(out, p.stmt.column_double(column(c))) {
                    Ok(()) => Reply::Code(ResultCode::OK),
                    Err(e) => memory_fault(&e),
                },
                Err(unknown) => unknown.status(),
            },
            Request::ColumnBytes { stmt, column: c } => match self.statement(stmt) {
                Ok(p) => count(p.stmt.column_bytes(column(c))),
                Err(unknown) => unknown.fault(),
            },
            Request::ColumnBlob { stmt, column: c, out } => match self.statement(stmt) {
                Ok(p) => {
                    let blob = p.stmt.column_blob(column(c));
                    if blob.len() != out.len {
                        warn!(
                            "column_blob buffer is {} bytes, value is {}",
                            out.len,
                            blob.len()
                        );
                        return Reply::Code(ResultCode::RANGE);
                    }
                    match memory.write(out.addr, &blob) {
                        Ok(()) => Reply::Code(ResultCode::OK),
                        Err(e) => memory_fault(&e),
                    }
                }
                Err(unknown) => unknown.status(),
            },
        }
    }

    // ── Connections ─────────────────────────────────────────────────────

    fn open(&mut self, name: String, image: Option<&[u8]>, mode: OpenMode) -> Reply {
        if image.is_none() && mode != OpenMode::ReadWriteCreate {
            debug!("open {name}: no image and create not requested");
            return Reply::Pair(ResultCode::CANTOPEN, 0);
        }
        let opened = Connection::open_image(
            image.unwrap_or_default(),
            mode.is_read_only(),
            self.verify_images,
        )
        .and_then(|conn| {
            let baseline = digest(&conn.serialize()?);
            Ok((conn, baseline))
        });
        let (conn, baseline) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                warn!("open {name} failed with {}: {}", e.code, e.message);
                return Reply::Pair(e.code, 0);
            }
        };
        let session = Session {
            conn,
            baseline,
            read_only: mode.is_read_only(),
        };
        let Some(db) = self.connections.insert(session) else {
            error!("connection handle space exhausted");
            return Reply::Pair(ResultCode::NOMEM, 0);
        };
        debug!(
            "opened {name} as connection {db}, image digest {}",
            hex::encode(&baseline[..8])
        );
        self.files.insert(db, name);
        Reply::Pair(ResultCode::OK, db.get())
    }

    fn close(&mut self, db: ConnectionHandle, flush: bool) -> Reply {
        let has_statements = self.statements.iter().any(|(_, p)| p.db == db);
        let session = if has_statements {
            self.connections.retire(db)
        } else {
            self.connections.remove(db)
        };
        let Some(session) = session else {
            return Unknown("connection", db.get()).status();
        };
        let name = self.files.remove(db).unwrap_or_default();

        let mut code = ResultCode::OK;
        if flush && !session.read_only {
            code = self.write_back(&name, &session);
        }
        if let Err(e) = session.conn.close() {
            warn!("close {name} failed with {}: {}", e.code, e.message);
            if code.is_ok() {
                code = e.code;
            }
        }
        debug!("closed connection {db} ({name})");
        Reply::Code(code)
    }

    fn write_back(&self, name: &str, session: &Session) -> ResultCode {
        // Serializing a fresh database reads its pages through the same
        // connection, which would capture uncommitted work.
        match session.conn.rollback_pending() {
            Ok(true) => warn!("{name} closed inside a transaction, rolled back"),
            Ok(false) => {}
            Err(e) => {
                error!("rollback of {name} failed with {}: {}", e.code, e.message);
                return e.code;
            }
        }
        let image = match session.conn.serialize() {
            Ok(image) => image,
            Err(e) => {
                error!("serialize {name} failed with {}: {}", e.code, e.message);
                return e.code;
            }
        };
        if digest(&image) == session.baseline {
            debug!("{name} unchanged, skipping write-back");
            return ResultCode::OK;
        }
        match self.store.write_atomic(name, &image) {
            Ok(()) => {
                debug!("wrote {} bytes back to {name}", image.len());
                ResultCode::OK
            }
            Err(e) => {
                error!("write-back of {name} failed: {e}");
                ResultCode::IOERR
            }
        }
    }

    fn connection(&self, db: ConnectionHandle) -> Result<&Session, Unknown> {
        self.connections
            .get(db)
            .ok_or(Unknown("connection", db.get()))
    }

    // ── Statements ──────────────────────────────────────────────────────

    fn prepare(&mut self, db: ConnectionHandle, sql: &str) -> Reply {
        let prepared = match self.connection(db) {
            Ok(session) => session.conn.prepare(sql),
            Err(unknown) => return unknown.pair(),
        };
        let stmt = match prepared {
            Ok(stmt) => stmt,
            Err(e) => {
                debug!("prepare failed with {}: {}", e.code, e.message);
                return Reply::Pair(e.code, 0);
            }
        };
        match self.statements.insert(LiveStatement { stmt, db }) {
            Some(handle) => Reply::Pair(ResultCode::OK, handle.get()),
            None => {
                error!("statement handle space exhausted");
                Reply::Pair(ResultCode::NOMEM, 0)
            }
        }
    }

    fn finalize(&mut self, stmt: StatementHandle) -> Reply {
        let Some(prepared) = self.statements.remove(stmt) else {
            return Unknown("statement", stmt.get()).status();
        };
        let db = prepared.db;
        let reply = status(prepared.stmt.finalize());
        if self.connections.is_retired(db) && !self.statements.iter().any(|(_, p)| p.db == db) {
            self.connections.reclaim(db);
            debug!("connection {db} released with its last statement");
        }
        reply
    }

    fn bind(&mut self, stmt: StatementHandle, index: i32, value: &Value) -> Reply {
        match self.statement_mut(stmt) {
            Ok(p) => status(p.stmt.bind(parameter(index), value)),
            Err(unknown) => unknown.status(),
        }
    }

    fn statement(&self, stmt: StatementHandle) -> Result<&LiveStatement, Unknown> {
        self.statements
            .get(stmt)
            .ok_or(Unknown("statement", stmt.get()))
    }

    fn statement_mut(&mut self, stmt: StatementHandle) -> Result<&mut LiveStatement, Unknown> {
        self.statements
            .get_mut(stmt)
            .ok_or(Unknown("statement", stmt.get()))
    }
}

impl Sandbox for Dispatcher {
    fn invoke(&mut self, envelope: &str, memory: &mut HostMemory) -> String {
        match Request::decode(envelope) {
            Ok(request) => self.dispatch(request, memory).render(),
            Err(e) => {
                warn!("rejected call envelope: {e}");
                Reply::Fault(e.to_string()).render()
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("connections", &self.connections.len())
            .field("statements", &self.statements.len())
            .field("verify_images", &self.verify_images)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
