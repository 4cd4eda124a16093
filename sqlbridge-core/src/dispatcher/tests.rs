use std::sync::Arc;

use sqlbridge_db::ResultCode;

use super::Dispatcher;
use crate::config::OpenMode;
use crate::handle::{ConnectionHandle, StatementHandle};
use crate::memory::{Addr, HostMemory};
use crate::protocol::{BlockRef, Reply, Request};
use crate::sandbox::Sandbox;
use crate::storage::{ImageStore, MemoryImageStore, StorageError, StorageResult};

struct Fixture {
    store: Arc<MemoryImageStore>,
    dispatcher: Dispatcher,
    memory: HostMemory,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryImageStore::new());
        let dispatcher = Dispatcher::new(store.clone());
        Self {
            store,
            dispatcher,
            memory: HostMemory::new(),
        }
    }

    fn run(&mut self, request: Request) -> Reply {
        self.dispatcher.dispatch(request, &mut self.memory)
    }

    fn open(&mut self, name: &str) -> ConnectionHandle {
        let image = self.store.read(name).expect("read");
        let pinned = image.map(|bytes| {
            let len = bytes.len();
            BlockRef {
                addr: self.memory.pin_inbound(bytes),
                len,
            }
        });
        let reply = self.run(Request::Open {
            name: name.to_string(),
            image: pinned,
            flags: OpenMode::ReadWriteCreate.flags(),
        });
        if let Some(block) = pinned {
            self.memory.release(block.addr);
        }
        match reply {
            Reply::Pair(ResultCode::OK, raw) => ConnectionHandle::from_raw(raw),
            other => panic!("open failed: {other:?}"),
        }
    }

    fn prepare(&mut self, db: ConnectionHandle, sql: &str) -> StatementHandle {
        match self.run(Request::Prepare2 {
            db,
            sql: sql.to_string(),
        }) {
            Reply::Pair(ResultCode::OK, raw) => StatementHandle::from_raw(raw),
            other => panic!("prepare failed: {other:?}"),
        }
    }

    fn exec(&mut self, db: ConnectionHandle, sql: &str) {
        let stmt = self.prepare(db, sql);
        assert_eq!(self.run(Request::Step { stmt }), Reply::Code(ResultCode::DONE));
        assert_eq!(self.run(Request::Finalize { stmt }), Reply::Code(ResultCode::OK));
    }
}

#[test]
fn open_records_file_name() {
    let mut fx = Fixture::new();
    let db = fx.open("/data/MyData.db");
    assert_eq!(fx.dispatcher.file_name(db), Some("/data/MyData.db"));
    assert_eq!(fx.dispatcher.live_connections(), 1);
    assert_eq!(
        fx.run(Request::Close { db, flush: true }),
        Reply::Code(ResultCode::OK)
    );
    assert_eq!(fx.dispatcher.file_name(db), None);
    assert_eq!(fx.dispatcher.live_connections(), 0);
}

#[test]
fn unchanged_database_is_not_written_back() {
    let mut fx = Fixture::new();
    let db = fx.open("fresh.db");
    let stmt = fx.prepare(db, "SELECT 1");
    assert_eq!(fx.run(Request::Step { stmt }), Reply::Code(ResultCode::ROW));
    fx.run(Request::Finalize { stmt });
    fx.run(Request::Close { db, flush: true });
    assert!(fx.store.is_empty());
}

#[test]
fn changed_database_is_written_back_and_reloads() {
    let mut fx = Fixture::new();
    let db = fx.open("app.db");
    fx.exec(db, "CREATE TABLE t (v TEXT)");
    fx.exec(db, "INSERT INTO t VALUES ('kept')");
    assert_eq!(
        fx.run(Request::Close { db, flush: true }),
        Reply::Code(ResultCode::OK)
    );
    assert_eq!(fx.store.names(), vec!["app.db".to_string()]);

    let db = fx.open("app.db");
    let stmt = fx.prepare(db, "SELECT v FROM t");
    assert_eq!(fx.run(Request::Step { stmt }), Reply::Code(ResultCode::ROW));
    assert_eq!(
        fx.run(Request::ColumnText { stmt, column: 0 }),
        Reply::Text(Some("kept".to_string()))
    );
}

#[test]
fn close_without_flush_discards_changes() {
    let mut fx = Fixture::new();
    let db = fx.open("scratch.db");
    fx.exec(db, "CREATE TABLE t (v)");
    fx.run(Request::Close { db, flush: false });
    assert!(fx.store.is_empty());
}

#[test]
fn double_close_is_misuse() {
    let mut fx = Fixture::new();
    let db = fx.open("a.db");
    assert_eq!(
        fx.run(Request::Close { db, flush: true }),
        Reply::Code(ResultCode::OK)
    );
    assert_eq!(
        fx.run(Request::Close { db, flush: true }),
        Reply::Code(ResultCode::MISUSE)
    );
}

#[test]
fn unknown_handles() {
    let mut fx = Fixture::new();
    let db = ConnectionHandle::from_raw(9);
    let stmt = StatementHandle::from_raw(0);
    assert_eq!(fx.run(Request::Step { stmt }), Reply::Code(ResultCode::MISUSE));
    assert_eq!(
        fx.run(Request::Prepare2 { db, sql: "SELECT 1".into() }),
        Reply::Pair(ResultCode::MISUSE, 0)
    );
    assert!(matches!(fx.run(Request::Changes { db }), Reply::Fault(_)));
    assert!(matches!(fx.run(Request::ColumnCount { stmt }), Reply::Fault(_)));
}

#[test]
fn missing_image_without_create_cannot_open() {
    let mut fx = Fixture::new();
    let reply = fx.run(Request::Open {
        name: "absent.db".into(),
        image: None,
        flags: OpenMode::ReadWrite.flags(),
    });
    assert_eq!(reply, Reply::Pair(ResultCode::CANTOPEN, 0));
    assert_eq!(fx.dispatcher.live_connections(), 0);
}

#[test]
fn corrupt_image_fails_at_open() {
    let mut fx = Fixture::new();
    let bytes = vec![0x42; 4096];
    let addr = fx.memory.pin_inbound(bytes);
    let reply = fx.run(Request::Open {
        name: "bad.db".into(),
        image: Some(BlockRef { addr, len: 4096 }),
        flags: OpenMode::ReadWriteCreate.flags(),
    });
    let Reply::Pair(code, 0) = reply else {
        panic!("expected failure pair, got {reply:?}");
    };
    assert_eq!(code.primary(), ResultCode::NOTADB);
    assert_eq!(fx.dispatcher.file_name(ConnectionHandle::from_raw(1)), None);
}

#[test]
fn wide_values_use_the_side_channel() {
    let mut fx = Fixture::new();
    let db = fx.open("wide.db");
    let stmt = fx.prepare(db, "SELECT ?1, ?2, ?3");

    let int_in = fx.memory.pin_inbound(i64::MAX.to_ne_bytes().to_vec());
    let dbl_in = fx.memory.pin_inbound((0.1_f64 + 0.2).to_ne_bytes().to_vec());
    let blob_in = fx.memory.pin_inbound(vec![0, 1, 2, 0xff]);
    assert_eq!(
        fx.run(Request::BindInt64 { stmt, index: 1, value: int_in }),
        Reply::Code(ResultCode::OK)
    );
    assert_eq!(
        fx.run(Request::BindDouble { stmt, index: 2, value: dbl_in }),
        Reply::Code(ResultCode::OK)
    );
    assert_eq!(
        fx.run(Request::BindBlob {
            stmt,
            index: 3,
            blob: BlockRef { addr: blob_in, len: 4 },
        }),
        Reply::Code(ResultCode::OK)
    );
    assert_eq!(fx.run(Request::Step { stmt }), Reply::Code(ResultCode::ROW));

    let int_out = fx.memory.pin_outbound(8);
    assert_eq!(
        fx.run(Request::ColumnInt64 { stmt, column: 0, out: int_out }),
        Reply::Code(ResultCode::OK)
    );
    let bytes = fx.memory.release(int_out).expect("pinned");
    assert_eq!(i64::from_ne_bytes(bytes.try_into().expect("8 bytes")), i64::MAX);

    let dbl_out = fx.memory.pin_outbound(8);
    fx.run(Request::ColumnDouble { stmt, column: 1, out: dbl_out });
    let bytes = fx.memory.release(dbl_out).expect("pinned");
    assert_eq!(
        f64::from_ne_bytes(bytes.try_into().expect("8 bytes")).to_bits(),
        (0.1_f64 + 0.2).to_bits()
    );

    assert_eq!(fx.run(Request::ColumnBytes { stmt, column: 2 }), Reply::Int(4));
    let blob_out = fx.memory.pin_outbound(4);
    assert_eq!(
        fx.run(Request::ColumnBlob {
            stmt,
            column: 2,
            out: BlockRef { addr: blob_out, len: 4 },
        }),
        Reply::Code(ResultCode::OK)
    );
    assert_eq!(fx.memory.release(blob_out), Some(vec![0, 1, 2, 0xff]));
}

#[test]
fn blob_buffer_of_wrong_length_is_range() {
    let mut fx = Fixture::new();
    let db = fx.open("range.db");
    let stmt = fx.prepare(db, "SELECT x'0102'");
    fx.run(Request::Step { stmt });
    let out = fx.memory.pin_outbound(8);
    assert_eq!(
        fx.run(Request::ColumnBlob {
            stmt,
            column: 0,
            out: BlockRef { addr: out, len: 8 },
        }),
        Reply::Code(ResultCode::RANGE)
    );
}

#[test]
fn bad_side_channel_address_faults() {
    let mut fx = Fixture::new();
    let db = fx.open("fault.db");
    let stmt = fx.prepare(db, "SELECT ?1");
    let reply = fx.run(Request::BindInt64 {
        stmt,
        index: 1,
        value: Addr::from_raw(0xdead_0000),
    });
    assert!(matches!(reply, Reply::Fault(_)), "{reply:?}");
}

#[test]
fn closing_with_live_statements_defers_handle_reuse() {
    let mut fx = Fixture::new();
    let db = fx.open("zombie.db");
    let stmt = fx.prepare(db, "SELECT 1");
    assert_eq!(
        fx.run(Request::Close { db, flush: true }),
        Reply::Code(ResultCode::OK)
    );

    let other = fx.open("other.db");
    assert_ne!(other, db, "retired handle must not be reissued");
    assert!(matches!(fx.run(Request::Changes { db }), Reply::Fault(_)));

    assert_eq!(fx.run(Request::Finalize { stmt }), Reply::Code(ResultCode::OK));
    let reused = fx.open("third.db");
    assert_eq!(reused, db);
}

#[test]
fn malformed_envelope_gets_a_fault_reply() {
    let mut fx = Fixture::new();
    let reply = fx.dispatcher.invoke("explode(1)", &mut fx.memory);
    assert!(reply.starts_with("fault: "), "{reply}");
    let reply = fx.dispatcher.invoke("libversion_number()", &mut fx.memory);
    assert!(reply.parse::<i64>().expect("numeric") >= 3_000_000);
}

#[test]
fn prepare_error_keeps_message_for_errmsg() {
    let mut fx = Fixture::new();
    let db = fx.open("err.db");
    let reply = fx.run(Request::Prepare2 {
        db,
        sql: "SELEC oops".into(),
    });
    assert_eq!(reply, Reply::Pair(ResultCode::ERROR, 0));
    let Reply::Text(Some(message)) = fx.run(Request::Errmsg { db }) else {
        panic!("errmsg must be text");
    };
    assert!(message.contains("syntax error"), "{message}");
    assert_eq!(fx.run(Request::Errcode { db }), Reply::Code(ResultCode::ERROR));
}

struct FailingStore;

impl ImageStore for FailingStore {
    fn read(&self, _name: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn write_atomic(&self, name: &str, _bytes: &[u8]) -> StorageResult<()> {
        Err(StorageError::InvalidName(name.to_string()))
    }

    fn delete(&self, _name: &str) -> StorageResult<()> {
        Ok(())
    }
}

#[test]
fn write_back_failure_is_ioerr_and_still_releases() {
    let mut dispatcher = Dispatcher::new(Arc::new(FailingStore));
    let mut memory = HostMemory::new();
    let Reply::Pair(ResultCode::OK, raw) = dispatcher.dispatch(
        Request::Open {
            name: "x.db".into(),
            image: None,
            flags: OpenMode::ReadWriteCreate.flags(),
        },
        &mut memory,
    ) else {
        panic!("open failed");
    };
    let db = ConnectionHandle::from_raw(raw);
    let Reply::Pair(ResultCode::OK, stmt) = dispatcher.dispatch(
        Request::Prepare2 {
            db,
            sql: "CREATE TABLE t (v)".into(),
        },
        &mut memory,
    ) else {
        panic!("prepare failed");
    };
    let stmt = StatementHandle::from_raw(stmt);
    dispatcher.dispatch(Request::Step { stmt }, &mut memory);
    dispatcher.dispatch(Request::Finalize { stmt }, &mut memory);

    assert_eq!(
        dispatcher.dispatch(Request::Close { db, flush: true }, &mut memory),
        Reply::Code(ResultCode::IOERR)
    );
    assert_eq!(dispatcher.live_connections(), 0);
    assert_eq!(dispatcher.file_name(db), None);
}
