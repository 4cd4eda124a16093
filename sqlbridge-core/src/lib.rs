//! Host/sandbox bridge for the `SQLite` C API.
//!
//! A [`Provider`] on the host exposes the native call surface. Each call is
//! encoded as a one-line text envelope and executed by a [`Sandbox`], which
//! in-process is a [`Dispatcher`] owning the engine objects. Handles cross
//! the boundary as opaque integers; 64-bit integers, doubles, blobs and
//! database images travel through the host-owned [`HostMemory`] side
//! channel. Databases are materialized from, and written back to, an
//! [`ImageStore`].
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sqlbridge_core::{BridgeConfig, MemoryImageStore, Provider, ResultCode};
//!
//! let store = Arc::new(MemoryImageStore::new());
//! let mut provider = Provider::in_process(store, BridgeConfig::default());
//! let db = provider.open("notes.db").into_result().expect("open");
//! let stmt = provider.prepare(db, "SELECT 40 + 2").into_result().expect("prepare");
//! assert_eq!(provider.step(stmt), ResultCode::ROW);
//! assert_eq!(provider.column_int(stmt, 0).expect("column"), 42);
//! assert_eq!(provider.finalize(stmt), ResultCode::OK);
//! assert_eq!(provider.close(db), ResultCode::OK);
//! ```
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod config;
pub use config::{BridgeConfig, OpenMode};

mod error;
pub use error::{BridgeError, BridgeResult};

mod handle;
pub use handle::{ConnectionHandle, Handle, StatementHandle};

pub mod logger;

pub mod memory;
pub use memory::{Addr, Direction, HostMemory, MemoryError};

pub mod protocol;

pub mod registry;

mod sandbox;
pub use sandbox::Sandbox;

pub mod storage;
pub use storage::{DirImageStore, ImageStore, MemoryImageStore, StorageError};

mod dispatcher;
pub use dispatcher::Dispatcher;

mod provider;
pub use provider::{
    ApiMember, AuthorizerCallback, Collation, Prepared, Provider, ScalarFunction, UpdateCallback,
};

pub use sqlbridge_db::{ColumnType, ResultCode};
