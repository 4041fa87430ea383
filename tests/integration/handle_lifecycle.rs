#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;

use limbo_bridge::{
    db::{CursorDimension, CursorMode, Holdability},
    ffi::{scripted::ScriptedEngine, translate::NativeErrorKind, BoundaryChannel, BoundaryOp},
    BridgeError, DatabaseHandle, OpenOptions, OpenTarget, Session,
};

fn setup() -> (Arc<ScriptedEngine>, BoundaryChannel) {
    let engine = Arc::new(ScriptedEngine::new());
    let channel = BoundaryChannel::new(engine.clone());
    (engine, channel)
}

#[test]
fn shared_connection_closed_from_many_threads() {
    let (engine, channel) = setup();
    let session = Arc::new(
        Session::open(&channel, &OpenTarget::memory(), OpenOptions::default())
            .expect("open session"),
    );

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.connection().close())
        })
        .collect();
    for handle in handles {
        handle.join().expect("join").expect("close");
    }

    assert_eq!(engine.calls(BoundaryOp::CloseConnection), 1);
    assert_eq!(engine.calls(BoundaryOp::CloseDatabase), 0);
    session.close().expect("close session");
    assert_eq!(engine.calls(BoundaryOp::CloseDatabase), 1);
    assert_eq!(engine.live_handles(), 0);
}

#[test]
fn failed_open_balances_opens_and_closes() {
    let (engine, channel) = setup();
    for code in [11, 14, 26] {
        engine.fail_next_with_handle(BoundaryOp::OpenDatabase, code, "open failed");
        let err = DatabaseHandle::open(&channel, &OpenTarget::memory(), OpenOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), Some(code));
    }
    assert_eq!(
        engine.calls(BoundaryOp::OpenDatabase),
        engine.calls(BoundaryOp::CloseDatabase)
    );
    assert_eq!(engine.live_handles(), 0);
}

#[test]
fn locked_database_surfaces_busy_error() {
    let (engine, channel) = setup();
    let session = Session::open(&channel, &OpenTarget::memory(), OpenOptions::default())
        .expect("open session");
    engine.fail_next(BoundaryOp::PrepareStatement, 5, "database is locked");

    let err = session.prepare("UPDATE t SET x = 1").unwrap_err();

    assert_eq!(err.code(), Some(5));
    match err {
        BridgeError::Native(native) => {
            assert_eq!(native.kind, NativeErrorKind::Busy);
            assert_eq!(native.message, "database is locked");
        }
        other => panic!("expected native error, got {other:?}"),
    }
    // The connection stays usable after a failed prepare.
    session.prepare("SELECT 1").expect("prepare after failure");
}

#[test]
fn malformed_error_message_still_reports_code() {
    let (engine, channel) = setup();
    let session = Session::open(&channel, &OpenTarget::memory(), OpenOptions::default())
        .expect("open session");
    engine.fail_next(BoundaryOp::PrepareStatement, 19, vec![0xc3, 0x28, b'!']);

    match session.prepare("INSERT INTO t VALUES (1)").unwrap_err() {
        BridgeError::Native(native) => {
            assert_eq!(native.code, 19);
            assert_eq!(native.kind, NativeErrorKind::Constraint);
            assert_eq!(native.message, "\u{fffd}(!");
        }
        other => panic!("expected native error, got {other:?}"),
    }
}

#[test]
fn cursor_modes_from_raw_constants() {
    CursorMode::from_raw(1003, 1007, 2).expect("forward-only read-only close-at-commit");
    match CursorMode::from_raw(1003, 1007, 1).unwrap_err() {
        BridgeError::UnsupportedCursorMode { dimension, .. } => {
            assert_eq!(dimension, CursorDimension::Holdability)
        }
        other => panic!("expected unsupported cursor mode, got {other:?}"),
    }
    assert_eq!(
        Holdability::from_raw(2).expect("raw holdability"),
        Holdability::CloseAtCommit
    );
}
