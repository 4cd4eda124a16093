//! Host-side provider.
//!
//! [`Provider`] exposes the native SQLite call surface on the host. Every
//! call is encoded as an envelope, handed to the [`Sandbox`], and the reply
//! decoded according to what the call returns:
//!
//! * status calls return a [`ResultCode`]; an undecodable reply becomes
//!   [`ResultCode::ERROR`],
//! * value calls return a [`BridgeResult`]; an undecodable reply is a
//!   [`BridgeError::Protocol`], never a made-up value,
//! * open and prepare return a [`Prepared`] pairing status and handle.
//!
//! Wide values travel through the provider's [`HostMemory`]: each block is
//! pinned right before its call and released right after, whatever the
//! outcome. Every operation takes `&mut self`, so one call is in flight at a
//! time.

mod api;
mod unsupported;

use std::sync::Arc;

use log::{debug, error, warn};
use sqlbridge_db::{ColumnType, ResultCode};

pub use api::ApiMember;
pub use unsupported::{AuthorizerCallback, Collation, ScalarFunction, UpdateCallback};

use crate::config::{BridgeConfig, OpenMode};
use crate::dispatcher::Dispatcher;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::{ConnectionHandle, StatementHandle};
use crate::memory::{HostMemory, MemoryError};
use crate::protocol::{
    parse_code, parse_int, parse_pair, parse_text, BlockRef, ProtocolError, Request,
};
use crate::sandbox::Sandbox;
use crate::storage::ImageStore;

/// Status plus the handle an open or prepare produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepared<H> {
    /// Native status code.
    pub status: ResultCode,
    /// The new handle; `Some` only when `status` is OK.
    pub handle: Option<H>,
}

impl<H> Prepared<H> {
    const fn failed(status: ResultCode) -> Self {
        Self {
            status,
            handle: None,
        }
    }

    /// The handle on success, the status otherwise.
    ///
    /// # Errors
    ///
    /// Returns the status when no handle was produced.
    pub fn into_result(self) -> Result<H, ResultCode> {
        match self.handle {
            Some(handle) => Ok(handle),
            None if self.status.is_ok() => Err(ResultCode::ERROR),
            None => Err(self.status),
        }
    }
}

/// Host-side implementation of the native call surface.
pub struct Provider<S = Dispatcher> {
    sandbox: S,
    memory: HostMemory,
    store: Arc<dyn ImageStore>,
    config: BridgeConfig,
}

impl Provider<Dispatcher> {
    /// Builds a provider wired to an in-process dispatcher sharing `store`.
    #[must_use]
    pub fn in_process(store: Arc<dyn ImageStore>, config: BridgeConfig) -> Self {
        let dispatcher = Dispatcher::with_config(Arc::clone(&store), &config);
        Self::new(dispatcher, store, config)
    }
}

impl<S: Sandbox> Provider<S> {
    /// Creates a provider talking to `sandbox` and reading images from
    /// `store`.
    #[must_use]
    pub fn new(sandbox: S, store: Arc<dyn ImageStore>, config: BridgeConfig) -> Self {
        Self {
            sandbox,
            memory: HostMemory::new(),
            store,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn bridge_config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The sandbox behind this provider.
    #[must_use]
    pub const fn sandbox(&self) -> &S {
        &self.sandbox
    }

    /// Side-channel blocks currently pinned. Zero between calls.
    #[must_use]
    pub fn pinned_blocks(&self) -> usize {
        self.memory.pinned()
    }

    // ── Connections ─────────────────────────────────────────────────────

    /// Opens `filename` with the configured [`OpenMode`].
    ///
    /// Existing storage is loaded into the new database; otherwise a fresh
    /// database is created when the mode allows it.
    pub fn open(&mut self, filename: &str) -> Prepared<ConnectionHandle> {
        self.open_with(filename, self.config.open_mode)
    }

    /// Opens `filename` with native open flags. The sandbox has a single VFS,
    /// so `vfs` is ignored.
    pub fn open_v2(
        &mut self,
        filename: &str,
        flags: i32,
        vfs: Option<&str>,
    ) -> Prepared<ConnectionHandle> {
        if let Some(vfs) = vfs {
            debug!("ignoring vfs {vfs} for {filename}");
        }
        self.open_with(filename, OpenMode::from_flags(flags))
    }

    fn open_with(&mut self, filename: &str, mode: OpenMode) -> Prepared<ConnectionHandle> {
        let image = match self.store.read(filename) {
            Ok(image) => image,
            Err(e) => {
                error!("cannot read {filename}: {e}");
                return Prepared::failed(ResultCode::IOERR);
            }
        };
        let name = filename.to_string();
        let flags = mode.flags();
        let opened = match image {
            Some(bytes) => self.with_inbound(bytes, |this, block| {
                this.call_pair(
                    &Request::Open {
                        name,
                        image: Some(block),
                        flags,
                    },
                    ConnectionHandle::from_raw,
                )
            }),
            None => self.call_pair(
                &Request::Open {
                    name,
                    image: None,
                    flags,
                },
                ConnectionHandle::from_raw,
            ),
        };
        if let (Some(db), Some(ms)) = (opened.handle, self.config.busy_timeout_ms) {
            let code = self.busy_timeout(db, i32::try_from(ms).unwrap_or(i32::MAX));
            if !code.is_ok() {
                warn!("busy timeout on {filename} failed with {code}");
            }
        }
        opened
    }

    /// Closes `db`, writing a changed image back when the configuration
    /// asks for it.
    pub fn close(&mut self, db: ConnectionHandle) -> ResultCode {
        let flush = self.config.flush_on_close;
        self.call_status(&Request::Close { db, flush })
    }

    /// Same as [`Provider::close`].
    pub fn close_v2(&mut self, db: ConnectionHandle) -> ResultCode {
        self.close(db)
    }

    /// Sets the busy timeout in milliseconds.
    pub fn busy_timeout(&mut self, db: ConnectionHandle, ms: i32) -> ResultCode {
        self.call_status(&Request::BusyTimeout { db, ms })
    }

    /// Version number of the engine inside the sandbox.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an undecodable reply.
    pub fn libversion_number(&mut self) -> BridgeResult<i32> {
        self.call_i32(&Request::LibversionNumber)
    }

    /// Rows changed by the most recent statement.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn changes(&mut self, db: ConnectionHandle) -> BridgeResult<i32> {
        self.call_i32(&Request::Changes { db })
    }

    /// Rows changed since the connection opened.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn total_changes(&mut self, db: ConnectionHandle) -> BridgeResult<i32> {
        self.call_i32(&Request::TotalChanges { db })
    }

    /// Rowid of the most recent insert.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn last_insert_rowid(&mut self, db: ConnectionHandle) -> BridgeResult<i64> {
        self.call_int(&Request::LastInsertRowid { db })
    }

    /// Most recent error message.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn errmsg(&mut self, db: ConnectionHandle) -> BridgeResult<String> {
        Ok(self.call_text(&Request::Errmsg { db })?.unwrap_or_default())
    }

    /// Most recent result code.
    pub fn errcode(&mut self, db: ConnectionHandle) -> ResultCode {
        self.call_status(&Request::Errcode { db })
    }

    // ── Statements ──────────────────────────────────────────────────────

    /// Prepares the first statement in `sql`.
    pub fn prepare(&mut self, db: ConnectionHandle, sql: &str) -> Prepared<StatementHandle> {
        self.call_pair(
            &Request::Prepare2 {
                db,
                sql: sql.to_string(),
            },
            StatementHandle::from_raw,
        )
    }

    /// Same as [`Provider::prepare`].
    pub fn prepare_v2(&mut self, db: ConnectionHandle, sql: &str) -> Prepared<StatementHandle> {
        self.prepare(db, sql)
    }

    /// Advances to the next row: `ROW`, `DONE` or an error status.
    pub fn step(&mut self, stmt: StatementHandle) -> ResultCode {
        self.call_status(&Request::Step { stmt })
    }

    /// Rewinds the statement.
    pub fn reset(&mut self, stmt: StatementHandle) -> ResultCode {
        self.call_status(&Request::Reset { stmt })
    }

    /// Destroys the statement.
    pub fn finalize(&mut self, stmt: StatementHandle) -> ResultCode {
        self.call_status(&Request::Finalize { stmt })
    }

    /// Number of SQL parameters.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn bind_parameter_count(&mut self, stmt: StatementHandle) -> BridgeResult<i32> {
        self.call_i32(&Request::BindParameterCount { stmt })
    }

    /// 1-based index of a named parameter, `0` when there is none.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn bind_parameter_index(&mut self, stmt: StatementHandle, name: &str) -> BridgeResult<i32> {
        self.call_i32(&Request::BindParameterIndex {
            stmt,
            name: name.to_string(),
        })
    }

    /// Binds SQL NULL to the 1-based parameter `index`.
    pub fn bind_null(&mut self, stmt: StatementHandle, index: i32) -> ResultCode {
        self.call_status(&Request::BindNull { stmt, index })
    }

    /// Binds a 32-bit integer.
    pub fn bind_int(&mut self, stmt: StatementHandle, index: i32, value: i32) -> ResultCode {
        self.call_status(&Request::BindInt { stmt, index, value })
    }

    /// Binds a 64-bit integer through the side channel.
    pub fn bind_int64(&mut self, stmt: StatementHandle, index: i32, value: i64) -> ResultCode {
        self.with_inbound(value.to_ne_bytes().to_vec(), |this, block| {
            this.call_status(&Request::BindInt64 {
                stmt,
                index,
                value: block.addr,
            })
        })
    }

    /// Binds a double through the side channel, bit for bit.
    pub fn bind_double(&mut self, stmt: StatementHandle, index: i32, value: f64) -> ResultCode {
        self.with_inbound(value.to_ne_bytes().to_vec(), |this, block| {
            this.call_status(&Request::BindDouble {
                stmt,
                index,
                value: block.addr,
            })
        })
    }

    /// Binds text.
    pub fn bind_text(&mut self, stmt: StatementHandle, index: i32, text: &str) -> ResultCode {
        self.call_status(&Request::BindText {
            stmt,
            index,
            text: text.to_string(),
        })
    }

    /// Binds a blob through the side channel.
    pub fn bind_blob(&mut self, stmt: StatementHandle, index: i32, blob: &[u8]) -> ResultCode {
        self.with_inbound(blob.to_vec(), |this, block| {
            this.call_status(&Request::BindBlob { stmt, index, blob: block })
        })
    }

    // ── Columns ─────────────────────────────────────────────────────────

    /// Number of result columns.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn column_count(&mut self, stmt: StatementHandle) -> BridgeResult<i32> {
        self.call_i32(&Request::ColumnCount { stmt })
    }

    /// Name of column `column`, `None` when out of range.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn column_name(
        &mut self,
        stmt: StatementHandle,
        column: i32,
    ) -> BridgeResult<Option<String>> {
        self.call_text(&Request::ColumnName { stmt, column })
    }

    /// Storage class of the value in `column`.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or a code the engine
    /// never produces.
    pub fn column_type(&mut self, stmt: StatementHandle, column: i32) -> BridgeResult<ColumnType> {
        let code = self.call_i32(&Request::ColumnType { stmt, column })?;
        ColumnType::from_code(code)
            .ok_or_else(|| ProtocolError::NotNumeric(format!("column type {code}")).into())
    }

    /// Value of `column` as text, `None` for SQL NULL.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn column_text(
        &mut self,
        stmt: StatementHandle,
        column: i32,
    ) -> BridgeResult<Option<String>> {
        self.call_text(&Request::ColumnText { stmt, column })
    }

    /// Value of `column` as a 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn column_int(&mut self, stmt: StatementHandle, column: i32) -> BridgeResult<i32> {
        self.call_i32(&Request::ColumnInt { stmt, column })
    }

    /// Value of `column` as a 64-bit integer, read through the side channel.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn column_int64(&mut self, stmt: StatementHandle, column: i32) -> BridgeResult<i64> {
        let bytes = self.read_outbound(8, |out| Request::ColumnInt64 {
            stmt,
            column,
            out: out.addr,
        })?;
        Ok(i64::from_ne_bytes(word(bytes)?))
    }

    /// Value of `column` as a double, read through the side channel.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn column_double(&mut self, stmt: StatementHandle, column: i32) -> BridgeResult<f64> {
        let bytes = self.read_outbound(8, |out| Request::ColumnDouble {
            stmt,
            column,
            out: out.addr,
        })?;
        Ok(f64::from_ne_bytes(word(bytes)?))
    }

    /// Byte length of the text or blob in `column`.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply.
    pub fn column_bytes(&mut self, stmt: StatementHandle, column: i32) -> BridgeResult<i32> {
        self.call_i32(&Request::ColumnBytes { stmt, column })
    }

    /// Value of `column` as a blob.
    ///
    /// Asks for the length first, then has the sandbox fill a block of
    /// exactly that size. An empty or NULL value costs no second call.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an unknown handle or undecodable reply,
    /// and [`BridgeError::Engine`] when the sandbox refuses the copy.
    pub fn column_blob(&mut self, stmt: StatementHandle, column: i32) -> BridgeResult<Vec<u8>> {
        let len = usize::try_from(self.column_bytes(stmt, column)?).unwrap_or(0);
        if len == 0 {
            return Ok(Vec::new());
        }
        self.read_outbound(len, |out| Request::ColumnBlob { stmt, column, out })
    }

    // ── Transport ───────────────────────────────────────────────────────

    fn call(&mut self, request: &Request) -> String {
        let envelope = request.encode();
        debug!("call {envelope}");
        let reply = self.sandbox.invoke(&envelope, &mut self.memory);
        debug!("reply {reply}");
        reply
    }

    fn rejected(request: &Request, err: ProtocolError) -> BridgeError {
        warn!("{} reply rejected: {err}", request.command());
        BridgeError::Protocol(err)
    }

    fn call_status(&mut self, request: &Request) -> ResultCode {
        let reply = self.call(request);
        parse_code(&reply).unwrap_or_else(|err| {
            warn!("{} reply rejected: {err}", request.command());
            ResultCode::ERROR
        })
    }

    fn call_int(&mut self, request: &Request) -> BridgeResult<i64> {
        let reply = self.call(request);
        parse_int(&reply).map_err(|err| Self::rejected(request, err))
    }

    fn call_i32(&mut self, request: &Request) -> BridgeResult<i32> {
        let value = self.call_int(request)?;
        i32::try_from(value).map_err(|_| {
            Self::rejected(
                request,
                ProtocolError::NotNumeric(format!("{value} is not a 32-bit value")),
            )
        })
    }

    fn call_text(&mut self, request: &Request) -> BridgeResult<Option<String>> {
        let reply = self.call(request);
        parse_text(&reply).map_err(|err| Self::rejected(request, err))
    }

    fn call_pair<H>(&mut self, request: &Request, wrap: fn(u32) -> H) -> Prepared<H> {
        let reply = self.call(request);
        match parse_pair(&reply) {
            Ok((status, 0)) if status.is_ok() => {
                warn!("{} succeeded without a handle", request.command());
                Prepared::failed(ResultCode::ERROR)
            }
            Ok((status, raw)) if status.is_ok() => Prepared {
                status,
                handle: Some(wrap(raw)),
            },
            Ok((status, _)) => Prepared::failed(status),
            Err(err) => {
                warn!("{} reply rejected: {err}", request.command());
                Prepared::failed(ResultCode::ERROR)
            }
        }
    }

    /// Pins `bytes` for the sandbox to read during `call`.
    fn with_inbound<T>(&mut self, bytes: Vec<u8>, call: impl FnOnce(&mut Self, BlockRef) -> T) -> T {
        let len = bytes.len();
        let addr = self.memory.pin_inbound(bytes);
        let out = call(self, BlockRef { addr, len });
        self.memory.release(addr);
        out
    }

    /// Pins a `len`-byte block for the sandbox to fill, then returns its
    /// contents if the sandbox reported success.
    fn read_outbound(
        &mut self,
        len: usize,
        build: impl FnOnce(BlockRef) -> Request,
    ) -> BridgeResult<Vec<u8>> {
        let addr = self.memory.pin_outbound(len);
        let request = build(BlockRef { addr, len });
        let reply = self.call(&request);
        let bytes = self.memory.release(addr).unwrap_or_default();
        let status = parse_code(&reply).map_err(|err| Self::rejected(&request, err))?;
        if !status.is_ok() {
            return Err(BridgeError::Engine(status));
        }
        if bytes.len() != len {
            return Err(MemoryError::OutOfBounds {
                addr,
                requested: len,
                size: bytes.len(),
            }
            .into());
        }
        Ok(bytes)
    }
}

fn word(bytes: Vec<u8>) -> BridgeResult<[u8; 8]> {
    let size = bytes.len();
    <[u8; 8]>::try_from(bytes).map_err(|_| {
        BridgeError::Protocol(ProtocolError::FieldCount {
            expected: 8,
            found: size,
        })
    })
}

impl<S> std::fmt::Debug for Provider<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("memory", &self.memory)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
