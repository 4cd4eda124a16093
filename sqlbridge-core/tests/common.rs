#![allow(dead_code)]

//! Common test utilities shared across integration tests.

use std::sync::Arc;

use sqlbridge_core::{
    BridgeConfig, ConnectionHandle, DirImageStore, ImageStore, MemoryImageStore, Provider,
    ResultCode, StatementHandle,
};
use tempfile::TempDir;

/// A provider over a directory store that lives as long as the fixture.
pub struct DirFixture {
    pub root: TempDir,
    pub store: Arc<DirImageStore>,
    pub provider: Provider,
}

impl DirFixture {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let store = Arc::new(DirImageStore::new(root.path()).expect("create store"));
        let provider = Provider::in_process(Arc::clone(&store) as Arc<dyn ImageStore>, config);
        Self {
            root,
            store,
            provider,
        }
    }

    /// A second provider over the same directory, as a fresh process would see it.
    pub fn reopen(&self) -> Provider {
        let store = DirImageStore::new(self.root.path()).expect("reopen store");
        Provider::in_process(Arc::new(store), BridgeConfig::default())
    }
}

/// A provider over an in-memory store, returned with the store for inspection.
pub fn memory_provider(config: BridgeConfig) -> (Provider, Arc<MemoryImageStore>) {
    let store = Arc::new(MemoryImageStore::new());
    let provider = Provider::in_process(Arc::clone(&store) as Arc<dyn ImageStore>, config);
    (provider, store)
}

pub fn open(provider: &mut Provider, name: &str) -> ConnectionHandle {
    let opened = provider.open(name);
    assert_eq!(opened.status, ResultCode::OK, "open {name}");
    opened.handle.expect("handle for a successful open")
}

pub fn prepare(provider: &mut Provider, db: ConnectionHandle, sql: &str) -> StatementHandle {
    provider
        .prepare_v2(db, sql)
        .into_result()
        .unwrap_or_else(|code| panic!("prepare `{sql}` failed with {code}"))
}

/// Prepares, steps to completion and finalizes a statement without results.
pub fn exec(provider: &mut Provider, db: ConnectionHandle, sql: &str) {
    let stmt = prepare(provider, db, sql);
    assert_eq!(provider.step(stmt), ResultCode::DONE, "step `{sql}`");
    assert_eq!(provider.finalize(stmt), ResultCode::OK, "finalize `{sql}`");
}
