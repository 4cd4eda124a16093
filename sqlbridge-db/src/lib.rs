//! Minimal safe `SQLite` wrapper for the sqlbridge sandbox.
//!
//! This crate provides a small, safe Rust API over the `SQLite` C FFI. The raw
//! symbols are resolved at compile time:
//!
//! * **Native** (`not(wasm32)`): the bundled `SQLite` linked by `rusqlite`,
//!   reached through `rusqlite::ffi`.
//! * **WASM** (`wasm32`): delegated to `sqlite-wasm-rs`, which ships its own
//!   WASM-compiled `SQLite`.
//!
//! Connections are always in-memory. Databases are loaded from and handed
//! back as serialized images ([`Connection::open_image`],
//! [`Connection::serialize`]), which is how the dispatcher materializes files
//! it cannot reach directly. Consumer code never touches raw FFI; the `ffi`
//! module holds every C declaration and is the **only** file that contains
//! `unsafe` code.

mod ffi;

mod connection;
pub mod error;
mod statement;
pub mod value;

pub use connection::{libversion_number, Connection};
pub use error::{DbError, DbResult, ResultCode};
pub use statement::{Statement, StepResult};
pub use value::{ColumnType, Value};
