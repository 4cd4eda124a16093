//! End-to-end tests: host provider, envelope, in-process dispatcher and
//! image storage working together.

mod common;

use common::{exec, memory_provider, open, prepare, DirFixture};
use sqlbridge_core::protocol::{Arg, Call, Command, Request};
use sqlbridge_core::{
    ApiMember, BridgeConfig, BridgeError, ColumnType, ImageStore, OpenMode, ResultCode,
};
use strum::IntoEnumIterator;
use test_case::test_case;

#[test_case("plain" ; "plain")]
#[test_case("say \"hi\"" ; "quotes")]
#[test_case("C:\\path\\to" ; "backslashes")]
#[test_case("line\nbreak\ttab\r" ; "control characters")]
#[test_case("nul\u{0}inside" ; "embedded nul")]
#[test_case("caf\u{e9} \u{1f980}" ; "non ascii")]
#[test_case("a, b) c(" ; "envelope punctuation")]
fn test_envelope_round_trips_tricky_text(text: &str) {
    let call = Call::new(
        Command::BindText,
        vec![Arg::Int(3), Arg::Int(1), Arg::Text(text.to_string())],
    );
    let decoded = Call::decode(&call.encode()).expect("decode own encoding");
    assert_eq!(decoded, call);
}

#[test]
fn test_request_decoding_rejects_wrong_arity() {
    let err = Request::decode("step(1, 2)").expect_err("step takes one argument");
    assert!(err.to_string().contains("step"), "{err}");
}

#[test]
fn test_created_database_persists_across_providers() {
    let mut fixture = DirFixture::new();
    let provider = &mut fixture.provider;

    let db = open(provider, "MyData.db");
    exec(provider, db, "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)");
    exec(provider, db, "INSERT INTO notes (body) VALUES ('first')");
    assert_eq!(provider.last_insert_rowid(db).expect("rowid"), 1);
    assert_eq!(provider.changes(db).expect("changes"), 1);
    assert_eq!(provider.close(db), ResultCode::OK);
    assert!(fixture.store.exists("MyData.db").expect("exists"));
    assert_eq!(provider.pinned_blocks(), 0);

    let mut second = fixture.reopen();
    let db = open(&mut second, "MyData.db");
    let stmt = prepare(&mut second, db, "SELECT body FROM notes WHERE id = 1");
    assert_eq!(second.step(stmt), ResultCode::ROW);
    assert_eq!(
        second.column_text(stmt, 0).expect("column_text").as_deref(),
        Some("first")
    );
    assert_eq!(second.step(stmt), ResultCode::DONE);
    assert_eq!(second.finalize(stmt), ResultCode::OK);
    assert_eq!(second.close(db), ResultCode::OK);
}

#[test]
fn test_untouched_database_is_not_written() {
    let (mut provider, store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "scratch.db");
    let stmt = prepare(&mut provider, db, "SELECT 1");
    assert_eq!(provider.step(stmt), ResultCode::ROW);
    assert_eq!(provider.finalize(stmt), ResultCode::OK);
    assert_eq!(provider.close(db), ResultCode::OK);
    assert!(store.is_empty());
}

#[test]
fn test_wide_values_are_lossless() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "wide.db");
    let stmt = prepare(&mut provider, db, "SELECT ?1, ?2");
    let sum = 0.1_f64 + 0.2_f64;
    assert_eq!(provider.bind_int64(stmt, 1, i64::MAX), ResultCode::OK);
    assert_eq!(provider.bind_double(stmt, 2, sum), ResultCode::OK);
    assert_eq!(provider.step(stmt), ResultCode::ROW);

    assert_eq!(provider.column_type(stmt, 0).expect("type"), ColumnType::Integer);
    assert_eq!(provider.column_int64(stmt, 0).expect("int64"), i64::MAX);
    assert_eq!(provider.column_type(stmt, 1).expect("type"), ColumnType::Float);
    assert_eq!(
        provider.column_double(stmt, 1).expect("double").to_bits(),
        sum.to_bits()
    );
    assert_eq!(provider.pinned_blocks(), 0);
    assert_eq!(provider.finalize(stmt), ResultCode::OK);
    assert_eq!(provider.close(db), ResultCode::OK);
}

#[test]
fn test_text_and_blob_values_survive_the_bridge() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "values.db");
    let stmt = prepare(&mut provider, db, "SELECT ?1, ?2, ?3, ?4");
    let text = "quote \" backslash \\ newline \n end";
    let blob = [0x00_u8, 0xFF, 0x10, 0x00, 0x7F];
    assert_eq!(provider.bind_text(stmt, 1, text), ResultCode::OK);
    assert_eq!(provider.bind_blob(stmt, 2, &blob), ResultCode::OK);
    assert_eq!(provider.bind_null(stmt, 3), ResultCode::OK);
    assert_eq!(provider.bind_int(stmt, 4, -7), ResultCode::OK);
    assert_eq!(provider.step(stmt), ResultCode::ROW);

    assert_eq!(provider.column_count(stmt).expect("count"), 4);
    assert_eq!(
        provider.column_text(stmt, 0).expect("text").as_deref(),
        Some(text)
    );
    assert_eq!(provider.column_bytes(stmt, 1).expect("bytes"), 5);
    assert_eq!(provider.column_blob(stmt, 1).expect("blob"), blob);
    assert_eq!(provider.column_type(stmt, 2).expect("type"), ColumnType::Null);
    assert_eq!(provider.column_text(stmt, 2).expect("null text"), None);
    assert!(provider.column_blob(stmt, 2).expect("null blob").is_empty());
    assert_eq!(provider.column_int(stmt, 3).expect("int"), -7);
    assert_eq!(provider.finalize(stmt), ResultCode::OK);
    assert_eq!(provider.close(db), ResultCode::OK);
}

#[test]
fn test_named_parameters_and_column_names() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "names.db");
    let stmt = prepare(&mut provider, db, "SELECT :first AS a, :second AS b");
    assert_eq!(provider.bind_parameter_count(stmt).expect("count"), 2);
    assert_eq!(provider.bind_parameter_index(stmt, ":second").expect("index"), 2);
    assert_eq!(provider.bind_parameter_index(stmt, ":missing").expect("index"), 0);
    assert_eq!(
        provider.column_name(stmt, 1).expect("name").as_deref(),
        Some("b")
    );
    assert_eq!(provider.column_name(stmt, 9).expect("name"), None);
    assert_eq!(provider.finalize(stmt), ResultCode::OK);
    assert_eq!(provider.close(db), ResultCode::OK);
}

#[test]
fn test_reset_replays_the_statement() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "reset.db");
    exec(&mut provider, db, "CREATE TABLE t (v INTEGER)");
    exec(&mut provider, db, "INSERT INTO t VALUES (10), (20)");
    assert_eq!(provider.total_changes(db).expect("total"), 2);

    let stmt = prepare(&mut provider, db, "SELECT v FROM t ORDER BY v");
    assert_eq!(provider.step(stmt), ResultCode::ROW);
    assert_eq!(provider.step(stmt), ResultCode::ROW);
    assert_eq!(provider.column_int(stmt, 0).expect("int"), 20);
    assert_eq!(provider.reset(stmt), ResultCode::OK);
    assert_eq!(provider.step(stmt), ResultCode::ROW);
    assert_eq!(provider.column_int(stmt, 0).expect("int"), 10);
    assert_eq!(provider.finalize(stmt), ResultCode::OK);
    assert_eq!(provider.close(db), ResultCode::OK);
}

#[test]
fn test_prepare_error_sets_errmsg() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "broken.db");
    let prepared = provider.prepare_v2(db, "SELEC 1");
    assert_eq!(prepared.status, ResultCode::ERROR);
    assert_eq!(prepared.handle, None);
    assert_eq!(provider.errcode(db), ResultCode::ERROR);
    let message = provider.errmsg(db).expect("errmsg");
    assert!(message.contains("syntax error"), "{message}");
    assert_eq!(provider.close(db), ResultCode::OK);
}

#[test]
fn test_double_close_is_misuse() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "twice.db");
    assert_eq!(provider.close(db), ResultCode::OK);
    assert_eq!(provider.close_v2(db), ResultCode::MISUSE);
}

#[test]
fn test_closed_connection_handle_is_rejected() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "gone.db");
    assert_eq!(provider.close(db), ResultCode::OK);
    assert_eq!(provider.prepare_v2(db, "SELECT 1").status, ResultCode::MISUSE);
    assert!(matches!(
        provider.changes(db),
        Err(BridgeError::Protocol(_))
    ));
}

#[test]
fn test_statement_outlives_its_closed_connection() {
    let (mut provider, store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "zombie.db");
    exec(&mut provider, db, "CREATE TABLE t (v TEXT)");
    let stmt = prepare(&mut provider, db, "SELECT count(*) FROM t");
    assert_eq!(provider.close(db), ResultCode::OK);
    assert!(store.exists("zombie.db").expect("exists"));

    let other = open(&mut provider, "other.db");
    assert_ne!(other, db, "a closed handle with live statements stays reserved");
    assert_eq!(provider.finalize(stmt), ResultCode::OK);
    assert_eq!(provider.close(other), ResultCode::OK);
}

#[test]
fn test_read_only_open_of_missing_storage_fails() {
    let config = BridgeConfig {
        open_mode: OpenMode::ReadOnly,
        ..BridgeConfig::default()
    };
    let (mut provider, _store) = memory_provider(config);
    let opened = provider.open("absent.db");
    assert_eq!(opened.status, ResultCode::CANTOPEN);
    assert_eq!(opened.handle, None);
}

#[test]
fn test_read_only_open_never_writes_back() {
    let mut fixture = DirFixture::new();
    let db = open(&mut fixture.provider, "ro.db");
    exec(&mut fixture.provider, db, "CREATE TABLE t (v INTEGER)");
    assert_eq!(fixture.provider.close(db), ResultCode::OK);
    let before = fixture.store.read("ro.db").expect("read").expect("image");

    let mut provider = fixture.reopen();
    let db = provider
        .open_v2("ro.db", OpenMode::ReadOnly.flags(), None)
        .into_result()
        .expect("open read-only");
    let stmt = prepare(&mut provider, db, "INSERT INTO t VALUES (1)");
    assert_eq!(provider.step(stmt).primary(), ResultCode::READONLY);
    assert_ne!(provider.finalize(stmt), ResultCode::MISUSE);
    assert_eq!(provider.close(db), ResultCode::OK);

    let after = fixture.store.read("ro.db").expect("read").expect("image");
    assert_eq!(before, after);
}

#[test]
fn test_open_v2_without_create_requires_existing_storage() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let opened = provider.open_v2("missing.db", OpenMode::ReadWrite.flags(), Some("unix"));
    assert_eq!(opened.status, ResultCode::CANTOPEN);
}

#[test]
fn test_corrupt_storage_is_not_a_database() {
    let (mut provider, store) = memory_provider(BridgeConfig::default());
    store
        .write_atomic("junk.db", &[0x42; 4096])
        .expect("seed junk");
    let opened = provider.open("junk.db");
    assert_eq!(opened.status.primary(), ResultCode::NOTADB);
    assert_eq!(provider.pinned_blocks(), 0);
}

#[test]
fn test_no_flush_close_discards_changes() {
    let config = BridgeConfig {
        flush_on_close: false,
        ..BridgeConfig::default()
    };
    let (mut provider, store) = memory_provider(config);
    let db = open(&mut provider, "volatile.db");
    exec(&mut provider, db, "CREATE TABLE t (v INTEGER)");
    assert_eq!(provider.close(db), ResultCode::OK);
    assert!(store.is_empty());
}

#[test]
fn test_close_inside_transaction_discards_uncommitted_schema() {
    let mut fixture = DirFixture::new();
    let provider = &mut fixture.provider;
    let db = open(provider, "fresh.db");
    exec(provider, db, "BEGIN");
    exec(provider, db, "CREATE TABLE t (v INTEGER)");
    exec(provider, db, "INSERT INTO t VALUES (1)");
    assert_eq!(provider.close(db), ResultCode::OK);

    let mut second = fixture.reopen();
    let db = open(&mut second, "fresh.db");
    let prepared = second.prepare_v2(db, "SELECT count(*) FROM t");
    assert_eq!(prepared.status, ResultCode::ERROR, "uncommitted table persisted");
    let message = second.errmsg(db).expect("errmsg");
    assert!(message.contains("no such table"), "{message}");
    assert_eq!(second.close(db), ResultCode::OK);
}

#[test]
fn test_close_inside_transaction_keeps_committed_rows() {
    let mut fixture = DirFixture::new();
    let provider = &mut fixture.provider;
    let db = open(provider, "ledger.db");
    exec(provider, db, "CREATE TABLE t (v INTEGER)");
    exec(provider, db, "INSERT INTO t VALUES (1)");
    assert_eq!(provider.close(db), ResultCode::OK);

    let db = open(provider, "ledger.db");
    exec(provider, db, "BEGIN");
    exec(provider, db, "INSERT INTO t VALUES (2)");
    assert_eq!(provider.close(db), ResultCode::OK);

    let mut second = fixture.reopen();
    let db = open(&mut second, "ledger.db");
    let stmt = prepare(&mut second, db, "SELECT count(*) FROM t");
    assert_eq!(second.step(stmt), ResultCode::ROW);
    assert_eq!(second.column_int(stmt, 0).expect("count"), 1);
    assert_eq!(second.finalize(stmt), ResultCode::OK);
    assert_eq!(second.close(db), ResultCode::OK);
}

#[test]
fn test_busy_timeout_from_config_is_applied() {
    let config = BridgeConfig {
        busy_timeout_ms: Some(250),
        ..BridgeConfig::default()
    };
    let (mut provider, _store) = memory_provider(config);
    let db = open(&mut provider, "busy.db");
    assert_eq!(provider.busy_timeout(db, 0), ResultCode::OK);
    assert_eq!(provider.close(db), ResultCode::OK);
}

#[test]
fn test_libversion_is_reported() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    assert!(provider.libversion_number().expect("libversion") >= 3_000_000);
}

#[test]
fn test_unsupported_members_fail_distinctly() {
    let (mut provider, _store) = memory_provider(BridgeConfig::default());
    let db = open(&mut provider, "unsupported.db");

    let err = provider.exec(db, "SELECT 1").expect_err("exec is not bridged");
    assert!(err.is_unsupported());
    assert!(matches!(err, BridgeError::Unsupported(ApiMember::Exec)));
    assert!(err.to_string().contains("sqlite3_exec"), "{err}");
    assert!(provider.backup_finish(1).expect_err("no backups").is_unsupported());
    assert!(provider.libversion().expect_err("text version").is_unsupported());

    let supported = provider.changes(db).expect("connection still usable");
    assert_eq!(supported, 0);
    assert_eq!(provider.close(db), ResultCode::OK);
}

#[test]
fn test_capability_surface_is_partitioned() {
    let supported: Vec<_> = ApiMember::iter().filter(|m| m.is_supported()).collect();
    assert!(supported.contains(&ApiMember::PrepareV2));
    assert!(supported.contains(&ApiMember::ColumnBlob));
    assert!(!supported.contains(&ApiMember::Exec));
    assert!(ApiMember::iter().any(|m| !m.is_supported()));
}
