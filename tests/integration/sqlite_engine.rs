#![allow(missing_docs)]

use std::sync::Arc;

use limbo_bridge::{
    engine::SqliteEngine,
    ffi::{translate::NativeErrorKind, BoundaryChannel},
    BridgeError, DatabaseHandle, OpenOptions, OpenTarget, Session,
};
use tempfile::TempDir;

fn sqlite() -> (Arc<SqliteEngine>, BoundaryChannel) {
    let engine = Arc::new(SqliteEngine::new());
    let channel = BoundaryChannel::new(engine.clone());
    (engine, channel)
}

fn native_kind(err: BridgeError) -> (NativeErrorKind, String) {
    match err {
        BridgeError::Native(native) => (native.kind, native.message),
        other => panic!("expected native error, got {other:?}"),
    }
}

#[test]
fn file_database_prepares_statements() {
    let dir = TempDir::new().expect("tempdir");
    let target = OpenTarget::path(dir.path().join("app.db")).expect("target");
    let (engine, channel) = sqlite();

    let session = Session::open(&channel, &target, OpenOptions::default()).expect("open");
    let create = session
        .prepare("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
        .expect("prepare create");
    let select = session.prepare("SELECT 1").expect("prepare select");
    assert_eq!(engine.live_counts(), (1, 1, 2));

    create.close().expect("close create");
    select.close().expect("close select");
    session.close().expect("close session");
    assert_eq!(engine.live_counts(), (0, 0, 0));
}

#[test]
fn syntax_errors_come_back_typed() {
    let (_engine, channel) = sqlite();
    let session =
        Session::open(&channel, &OpenTarget::memory(), OpenOptions::default()).expect("open");

    let err = session.prepare("SELEC 1").unwrap_err();
    assert_eq!(err.code(), Some(1));
    let (kind, message) = native_kind(err);
    assert_eq!(kind, NativeErrorKind::Error);
    assert!(message.contains("syntax error"), "{message}");

    let (kind, message) = native_kind(session.prepare("SELECT * FROM missing").unwrap_err());
    assert_eq!(kind, NativeErrorKind::Error);
    assert!(message.contains("no such table"), "{message}");
}

#[test]
fn unopenable_path_is_cant_open() {
    let dir = TempDir::new().expect("tempdir");
    let target =
        OpenTarget::path(dir.path().join("missing").join("nested").join("app.db")).expect("target");
    let (engine, channel) = sqlite();

    let err = DatabaseHandle::open(&channel, &target, OpenOptions::default()).unwrap_err();

    let (kind, _) = native_kind(err);
    assert_eq!(kind, NativeErrorKind::CantOpen);
    assert_eq!(engine.live_counts(), (0, 0, 0));
}

#[test]
fn memory_databases_get_independent_handles() {
    let (engine, channel) = sqlite();
    let first = DatabaseHandle::open(&channel, &OpenTarget::memory(), OpenOptions::default())
        .expect("open first");
    let second = DatabaseHandle::open(&channel, &OpenTarget::memory(), OpenOptions::default())
        .expect("open second");
    assert_ne!(first.id(), second.id());

    let a = first.connect().expect("connect a");
    let b = first.connect().expect("connect b");
    let c = second.connect().expect("connect c");
    assert_eq!(engine.live_counts(), (2, 3, 0));

    for conn in [&a, &b, &c] {
        conn.close().expect("close conn");
    }
    first.close().expect("close first");
    second.close().expect("close second");
    assert_eq!(engine.live_counts(), (0, 0, 0));
}

#[test]
fn locator_with_busy_timeout_opens() {
    let dir = TempDir::new().expect("tempdir");
    let locator = format!(
        "jdbc:sqlite:{}?busy_timeout=3000",
        dir.path().join("timeout.db").display()
    );
    let (_engine, channel) = sqlite();

    let session = Session::open_locator(&channel, &locator, [("busy_timeout", "100")])
        .expect("open locator");

    assert_eq!(
        session.connection().busy_timeout(),
        std::time::Duration::ZERO
    );
    session.prepare("SELECT 1").expect("prepare");
}
