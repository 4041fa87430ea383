//! In-memory engine with call counters and failure injection.
//!
//! Used to exercise handle lifecycles without a real database: every call is
//! counted, live handles are tracked so a double release surfaces as
//! `SQLITE_MISUSE`, and faults can be queued per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

use super::{BoundaryOp, ErrorSlot, NativeEngine};
use crate::db::config::{OpenOptions, OpenTarget};
use crate::error::ResourceKind;
use crate::types::RawHandle;

const MISUSE: i32 = 21;

#[derive(Clone, Debug)]
enum Fault {
    Raise {
        code: i32,
        message: Vec<u8>,
        with_handle: bool,
    },
    NullHandle,
}

/// Scriptable [`NativeEngine`].
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    calls: Mutex<HashMap<BoundaryOp, usize>>,
    faults: Mutex<HashMap<BoundaryOp, VecDeque<Fault>>>,
    live: Mutex<HashMap<RawHandle, ResourceKind>>,
    prepared: Mutex<Vec<Vec<u8>>>,
    next_handle: AtomicI64,
}

impl ScriptedEngine {
    /// Creates an engine with no queued faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `op` call raise `(code, message)` and return no handle.
    pub fn fail_next(&self, op: BoundaryOp, code: i32, message: impl Into<Vec<u8>>) {
        self.push_fault(
            op,
            Fault::Raise {
                code,
                message: message.into(),
                with_handle: false,
            },
        );
    }

    /// Makes the next `op` call allocate a handle, raise, and return the handle anyway.
    pub fn fail_next_with_handle(&self, op: BoundaryOp, code: i32, message: impl Into<Vec<u8>>) {
        self.push_fault(
            op,
            Fault::Raise {
                code,
                message: message.into(),
                with_handle: true,
            },
        );
    }

    /// Makes the next `op` call return a null handle without raising.
    pub fn return_null_next(&self, op: BoundaryOp) {
        self.push_fault(op, Fault::NullHandle);
    }

    /// Number of times `op` was invoked.
    pub fn calls(&self, op: BoundaryOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Number of invocations across all operations.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Handles allocated and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.lock().len()
    }

    /// SQL payloads received by `prepare_statement`, in call order.
    pub fn prepared_sql(&self) -> Vec<Vec<u8>> {
        self.prepared.lock().clone()
    }

    fn push_fault(&self, op: BoundaryOp, fault: Fault) {
        self.faults.lock().entry(op).or_default().push_back(fault);
    }

    fn enter(&self, op: BoundaryOp) -> Option<Fault> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        self.faults.lock().get_mut(&op).and_then(VecDeque::pop_front)
    }

    fn allocate(&self, kind: ResourceKind) -> RawHandle {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.lock().insert(raw, kind);
        raw
    }

    fn acquire(
        &self,
        op: BoundaryOp,
        parent: Option<(RawHandle, ResourceKind)>,
        kind: ResourceKind,
        errors: &mut ErrorSlot,
    ) -> RawHandle {
        match self.enter(op) {
            Some(Fault::Raise {
                code,
                message,
                with_handle,
            }) => {
                errors.raise(code, message);
                return if with_handle { self.allocate(kind) } else { 0 };
            }
            Some(Fault::NullHandle) => return 0,
            None => {}
        }
        if let Some((raw, expected)) = parent {
            if self.live.lock().get(&raw) != Some(&expected) {
                errors.raise(MISUSE, format!("invalid {expected} handle {raw}"));
                return 0;
            }
        }
        self.allocate(kind)
    }

    fn release(&self, op: BoundaryOp, raw: RawHandle, kind: ResourceKind, errors: &mut ErrorSlot) {
        if let Some(Fault::Raise { code, message, .. }) = self.enter(op) {
            errors.raise(code, message);
            return;
        }
        let mut live = self.live.lock();
        if live.get(&raw) == Some(&kind) {
            live.remove(&raw);
        } else {
            errors.raise(MISUSE, format!("{kind} handle {raw} already released"));
        }
    }
}

impl NativeEngine for ScriptedEngine {
    fn open_database(
        &self,
        _target: &OpenTarget,
        _options: &OpenOptions,
        errors: &mut ErrorSlot,
    ) -> RawHandle {
        self.acquire(BoundaryOp::OpenDatabase, None, ResourceKind::Database, errors)
    }

    fn open_connection(&self, db: RawHandle, errors: &mut ErrorSlot) -> RawHandle {
        self.acquire(
            BoundaryOp::OpenConnection,
            Some((db, ResourceKind::Database)),
            ResourceKind::Connection,
            errors,
        )
    }

    fn prepare_statement(
        &self,
        conn: RawHandle,
        sql: &[u8],
        errors: &mut ErrorSlot,
    ) -> RawHandle {
        self.prepared.lock().push(sql.to_vec());
        self.acquire(
            BoundaryOp::PrepareStatement,
            Some((conn, ResourceKind::Connection)),
            ResourceKind::Statement,
            errors,
        )
    }

    fn close_statement(&self, stmt: RawHandle, errors: &mut ErrorSlot) {
        self.release(BoundaryOp::CloseStatement, stmt, ResourceKind::Statement, errors)
    }

    fn close_connection(&self, conn: RawHandle, errors: &mut ErrorSlot) {
        self.release(BoundaryOp::CloseConnection, conn, ResourceKind::Connection, errors)
    }

    fn close_database(&self, db: RawHandle, errors: &mut ErrorSlot) {
        self.release(BoundaryOp::CloseDatabase, db, ResourceKind::Database, errors)
    }
}
