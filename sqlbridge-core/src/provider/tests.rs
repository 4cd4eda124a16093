use std::collections::VecDeque;
use std::sync::Arc;

use sqlbridge_db::{ResultCode, Value};
use test_case::test_case;

use super::{ApiMember, Prepared, Provider};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::handle::{ConnectionHandle, StatementHandle};
use crate::memory::HostMemory;
use crate::protocol::ProtocolError;
use crate::sandbox::Sandbox;
use crate::storage::{ImageStore, MemoryImageStore, StorageError, StorageResult};

/// Answers from a fixed script and records what it saw.
#[derive(Default)]
struct Scripted {
    replies: VecDeque<String>,
    calls: Vec<String>,
    pinned_during: Vec<usize>,
}

impl Sandbox for Scripted {
    fn invoke(&mut self, envelope: &str, memory: &mut HostMemory) -> String {
        self.calls.push(envelope.to_string());
        self.pinned_during.push(memory.pinned());
        self.replies
            .pop_front()
            .unwrap_or_else(|| "fault: script exhausted".to_string())
    }
}

fn scripted(replies: &[&str]) -> Provider<Scripted> {
    scripted_with(replies, BridgeConfig::default(), Arc::new(MemoryImageStore::new()))
}

fn scripted_with(
    replies: &[&str],
    config: BridgeConfig,
    store: Arc<dyn ImageStore>,
) -> Provider<Scripted> {
    let sandbox = Scripted {
        replies: replies.iter().map(ToString::to_string).collect(),
        ..Scripted::default()
    };
    Provider::new(sandbox, store, config)
}

const DB: ConnectionHandle = ConnectionHandle::from_raw(7);
const STMT: StatementHandle = StatementHandle::from_raw(3);

#[test]
fn well_formed_pair_yields_handle() {
    let mut provider = scripted(&["0;42"]);
    let opened = provider.open("a.db");
    assert_eq!(
        opened,
        Prepared {
            status: ResultCode::OK,
            handle: Some(ConnectionHandle::from_raw(42)),
        }
    );
    assert_eq!(opened.into_result(), Ok(ConnectionHandle::from_raw(42)));
}

#[test_case("abc" ; "single field")]
#[test_case("0;1;2" ; "three fields")]
#[test_case("0;x" ; "non numeric handle")]
#[test_case("0;0" ; "success without handle")]
#[test_case("fault: unknown command" ; "fault")]
fn malformed_pair_is_generic_error(reply: &str) {
    let mut provider = scripted(&[reply]);
    let prepared = provider.prepare(DB, "SELECT 1");
    assert_eq!(prepared.status, ResultCode::ERROR);
    assert_eq!(prepared.handle, None);
}

#[test]
fn failure_pair_keeps_status() {
    let mut provider = scripted(&["14;0"]);
    let opened = provider.open("a.db");
    assert_eq!(opened.status, ResultCode::CANTOPEN);
    assert_eq!(opened.into_result(), Err(ResultCode::CANTOPEN));
}

#[test]
fn status_call_maps_garbage_to_error() {
    let mut provider = scripted(&["abc", "101"]);
    assert_eq!(provider.step(STMT), ResultCode::ERROR);
    assert_eq!(provider.step(STMT), ResultCode::DONE);
}

#[test]
fn value_call_never_invents_a_value() {
    let mut provider = scripted(&["abc", "fault: unknown connection handle 7"]);
    assert!(matches!(
        provider.changes(DB),
        Err(BridgeError::Protocol(ProtocolError::NotNumeric(_)))
    ));
    assert!(matches!(
        provider.last_insert_rowid(DB),
        Err(BridgeError::Protocol(ProtocolError::Fault(_)))
    ));
}

#[test]
fn out_of_range_i32_is_rejected() {
    let mut provider = scripted(&["4294967296"]);
    assert!(provider.column_count(STMT).is_err());
}

#[test]
fn wide_bind_pins_for_the_call_only() {
    let mut provider = scripted(&["0", "garbage"]);
    assert_eq!(provider.bind_int64(STMT, 1, i64::MAX), ResultCode::OK);
    assert_eq!(provider.bind_double(STMT, 2, 0.5), ResultCode::ERROR);
    assert_eq!(provider.sandbox().pinned_during, vec![1, 1]);
    assert_eq!(provider.pinned_blocks(), 0);
    assert!(provider.sandbox().calls[0].starts_with("bind_int64(3, 1, 0x"));
}

#[test]
fn wide_column_error_status_releases_block() {
    let mut provider = scripted(&["21"]);
    assert!(matches!(
        provider.column_int64(STMT, 0),
        Err(BridgeError::Engine(ResultCode::MISUSE))
    ));
    assert_eq!(provider.pinned_blocks(), 0);
}

#[test]
fn empty_blob_skips_the_copy() {
    let mut provider = scripted(&["0"]);
    assert_eq!(provider.column_blob(STMT, 0).expect("blob"), Vec::<u8>::new());
    assert_eq!(provider.sandbox().calls, vec!["column_bytes(3, 0)".to_string()]);
}

#[test]
fn blob_read_sizes_the_block_from_column_bytes() {
    let mut provider = scripted(&["5", "0"]);
    let blob = provider.column_blob(STMT, 1).expect("blob");
    assert_eq!(blob, vec![0; 5], "scripted sandbox never writes");
    let calls = &provider.sandbox().calls;
    assert!(calls[1].starts_with("column_blob(3, 1, 0x"), "{}", calls[1]);
    assert!(calls[1].ends_with(", 5)"), "{}", calls[1]);
}

#[test]
fn open_passes_existing_image_through_the_side_channel() {
    let store = Arc::new(MemoryImageStore::new());
    store.write_atomic("/data/My.db", b"abc").expect("seed");
    let mut provider = scripted_with(&["0;1"], BridgeConfig::default(), store);
    provider.open("/data/My.db");
    let call = &provider.sandbox().calls[0];
    assert!(call.starts_with(r#"open("/data/My.db", 0x"#), "{call}");
    assert!(call.ends_with(", 3, 6)"), "{call}");
    assert_eq!(provider.sandbox().pinned_during, vec![1]);
    assert_eq!(provider.pinned_blocks(), 0);
}

#[test]
fn open_applies_configured_busy_timeout() {
    let config = BridgeConfig {
        busy_timeout_ms: Some(250),
        ..BridgeConfig::default()
    };
    let mut provider = scripted_with(&["0;4", "0"], config, Arc::new(MemoryImageStore::new()));
    provider.open("a.db");
    assert_eq!(
        provider.sandbox().calls,
        vec![
            r#"open("a.db", null, 0, 6)"#.to_string(),
            "busy_timeout(4, 250)".to_string(),
        ]
    );
}

#[test]
fn close_carries_the_flush_setting() {
    let config = BridgeConfig {
        flush_on_close: false,
        ..BridgeConfig::default()
    };
    let mut provider = scripted_with(&["0"], config, Arc::new(MemoryImageStore::new()));
    assert_eq!(provider.close_v2(DB), ResultCode::OK);
    assert_eq!(provider.sandbox().calls, vec!["close(7, 0)".to_string()]);
}

struct UnreadableStore;

impl ImageStore for UnreadableStore {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        Err(StorageError::InvalidName(name.to_string()))
    }

    fn write_atomic(&self, _name: &str, _bytes: &[u8]) -> StorageResult<()> {
        Ok(())
    }

    fn delete(&self, _name: &str) -> StorageResult<()> {
        Ok(())
    }
}

#[test]
fn unreadable_storage_fails_before_the_sandbox() {
    let mut provider = scripted_with(&[], BridgeConfig::default(), Arc::new(UnreadableStore));
    assert_eq!(provider.open("x.db").status, ResultCode::IOERR);
    assert!(provider.sandbox().calls.is_empty());
}

#[test]
fn unsupported_members_fail_without_a_call() {
    let mut provider = scripted(&[]);
    let err = provider
        .backup_init(DB, "main", DB, "main")
        .expect_err("backup is not carried");
    assert!(err.is_unsupported());
    assert!(matches!(err, BridgeError::Unsupported(ApiMember::BackupInit)));
    assert_eq!(
        err.to_string(),
        "sqlite3_backup_init is not supported in this environment"
    );
    assert!(provider
        .create_function(DB, "f", 1, Box::new(|_: &[Value]| Value::Null))
        .is_err());
    assert!(provider.sandbox().calls.is_empty());
}
