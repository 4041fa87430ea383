#![forbid(unsafe_code)]

//! Boundary channel between the bridge and the native engine.
//!
//! The native side never reports failure through its return value. It calls
//! back into an [`ErrorSlot`] with `(code, message bytes)` and then returns
//! whatever it has, possibly a half-built handle. [`BoundaryChannel`] installs
//! a fresh slot for every call and folds the two channels into a
//! [`NativeOutcome`], where a raised error always wins over the returned
//! value.

pub mod scripted;
pub mod translate;

use std::fmt;
use std::num::NonZeroI64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::db::config::{OpenOptions, OpenTarget};
use crate::error::{BridgeError, NativeError, Result};
use crate::types::{ConnectionRef, DatabaseRef, RawHandle, StatementRef};

use self::translate::{translate, CODE_UNKNOWN};

/// Call surface implemented by a native engine.
///
/// Handle-returning calls return `0` when they have nothing to hand back.
/// Failures are reported through `errors`; a raised error overrides the
/// returned value. Calls may block for the full duration of the native work
/// and cannot be cancelled.
///
/// Engines are shared between handles, but a single connection and the
/// statements derived from it are driven by one caller at a time.
pub trait NativeEngine: Send + Sync {
    /// Opens the database named by `target`.
    fn open_database(
        &self,
        target: &OpenTarget,
        options: &OpenOptions,
        errors: &mut ErrorSlot,
    ) -> RawHandle;

    /// Derives a connection from an open database.
    fn open_connection(&self, db: RawHandle, errors: &mut ErrorSlot) -> RawHandle;

    /// Compiles UTF-8 encoded SQL on a connection.
    fn prepare_statement(&self, conn: RawHandle, sql: &[u8], errors: &mut ErrorSlot)
        -> RawHandle;

    /// Releases a prepared statement.
    fn close_statement(&self, stmt: RawHandle, errors: &mut ErrorSlot);

    /// Releases a connection.
    fn close_connection(&self, conn: RawHandle, errors: &mut ErrorSlot);

    /// Releases a database.
    fn close_database(&self, db: RawHandle, errors: &mut ErrorSlot);
}

/// Identifies a boundary call, for logging and instrumentation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BoundaryOp {
    /// `open_database`
    OpenDatabase,
    /// `open_connection`
    OpenConnection,
    /// `prepare_statement`
    PrepareStatement,
    /// `close_statement`
    CloseStatement,
    /// `close_connection`
    CloseConnection,
    /// `close_database`
    CloseDatabase,
}

impl BoundaryOp {
    /// Stable name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryOp::OpenDatabase => "open_database",
            BoundaryOp::OpenConnection => "open_connection",
            BoundaryOp::PrepareStatement => "prepare_statement",
            BoundaryOp::CloseStatement => "close_statement",
            BoundaryOp::CloseConnection => "close_connection",
            BoundaryOp::CloseDatabase => "close_database",
        }
    }
}

impl fmt::Display for BoundaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw error as delivered by the native side.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RaisedError {
    /// Native result code.
    pub code: i32,
    /// Undecoded message bytes.
    pub message: Vec<u8>,
}

/// Out-of-band error channel handed to the engine for one call.
///
/// The first raise is authoritative; later raises within the same call are
/// ignored.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    raised: Option<RaisedError>,
}

impl ErrorSlot {
    /// Reports a failure for the current call.
    pub fn raise(&mut self, code: i32, message: impl Into<Vec<u8>>) {
        if self.raised.is_none() {
            self.raised = Some(RaisedError {
                code,
                message: message.into(),
            });
        }
    }

    /// Returns `true` once an error has been raised.
    pub fn is_raised(&self) -> bool {
        self.raised.is_some()
    }

    fn into_raised(self) -> Option<RaisedError> {
        self.raised
    }
}

/// Tagged result of a boundary call.
#[derive(Debug)]
pub enum NativeOutcome<T> {
    /// The call succeeded and produced `T`.
    Success(T),
    /// The call raised. `partial` holds whatever the engine returned anyway.
    Failure {
        /// Translated error.
        error: NativeError,
        /// Handle returned alongside the error, which still has to be released.
        partial: Option<T>,
    },
}

impl<T> NativeOutcome<T> {
    /// Converts into a `Result`, releasing any partial value with `release`.
    ///
    /// A failure of `release` is attached to the primary error as suppressed.
    pub fn settle<F>(self, release: F) -> Result<T>
    where
        F: FnOnce(T) -> Result<()>,
    {
        match self {
            NativeOutcome::Success(value) => Ok(value),
            NativeOutcome::Failure { error, partial } => {
                let primary = BridgeError::Native(error);
                match partial {
                    Some(value) => match release(value) {
                        Ok(()) => Err(primary),
                        Err(cleanup) => Err(primary.with_suppressed(cleanup)),
                    },
                    None => Err(primary),
                }
            }
        }
    }

    fn map<U>(self, f: impl Fn(T) -> U) -> NativeOutcome<U> {
        match self {
            NativeOutcome::Success(value) => NativeOutcome::Success(f(value)),
            NativeOutcome::Failure { error, partial } => NativeOutcome::Failure {
                error,
                partial: partial.map(f),
            },
        }
    }
}

/// The only accessor allowed to dereference capabilities.
///
/// Cheap to clone; all clones share the engine and the id sequence used for
/// handle identities.
#[derive(Clone)]
pub struct BoundaryChannel {
    engine: Arc<dyn NativeEngine>,
    next_id: Arc<AtomicU64>,
}

impl fmt::Debug for BoundaryChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryChannel")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl BoundaryChannel {
    /// Wraps a native engine.
    pub fn new(engine: Arc<dyn NativeEngine>) -> Self {
        Self {
            engine,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn acquire<F>(&self, op: BoundaryOp, call: F) -> NativeOutcome<NonZeroI64>
    where
        F: FnOnce(&dyn NativeEngine, &mut ErrorSlot) -> RawHandle,
    {
        trace!(op = op.as_str(), "bridge.boundary.invoke");
        let mut slot = ErrorSlot::default();
        let raw = call(self.engine.as_ref(), &mut slot);
        match (slot.into_raised(), NonZeroI64::new(raw)) {
            (Some(raised), partial) => {
                trace!(op = op.as_str(), code = raised.code, raw, "bridge.boundary.raised");
                NativeOutcome::Failure {
                    error: translate(raised.code, &raised.message),
                    partial,
                }
            }
            (None, Some(handle)) => NativeOutcome::Success(handle),
            (None, None) => NativeOutcome::Failure {
                error: translate(
                    CODE_UNKNOWN,
                    format!("{op} returned no handle and raised no error").as_bytes(),
                ),
                partial: None,
            },
        }
    }

    fn release<F>(&self, op: BoundaryOp, call: F) -> Result<()>
    where
        F: FnOnce(&dyn NativeEngine, &mut ErrorSlot),
    {
        trace!(op = op.as_str(), "bridge.boundary.invoke");
        let mut slot = ErrorSlot::default();
        call(self.engine.as_ref(), &mut slot);
        match slot.into_raised() {
            Some(raised) => Err(translate(raised.code, &raised.message).into()),
            None => Ok(()),
        }
    }

    pub(crate) fn open_database(
        &self,
        target: &OpenTarget,
        options: &OpenOptions,
    ) -> NativeOutcome<DatabaseRef> {
        self.acquire(BoundaryOp::OpenDatabase, |engine, slot| {
            engine.open_database(target, options, slot)
        })
        .map(DatabaseRef::from_raw)
    }

    pub(crate) fn open_connection(&self, db: &DatabaseRef) -> NativeOutcome<ConnectionRef> {
        self.acquire(BoundaryOp::OpenConnection, |engine, slot| {
            engine.open_connection(db.raw(), slot)
        })
        .map(ConnectionRef::from_raw)
    }

    pub(crate) fn prepare_statement(
        &self,
        conn: &ConnectionRef,
        sql: &[u8],
    ) -> NativeOutcome<StatementRef> {
        self.acquire(BoundaryOp::PrepareStatement, |engine, slot| {
            engine.prepare_statement(conn.raw(), sql, slot)
        })
        .map(StatementRef::from_raw)
    }

    pub(crate) fn close_statement(&self, stmt: StatementRef) -> Result<()> {
        self.release(BoundaryOp::CloseStatement, |engine, slot| {
            engine.close_statement(stmt.raw(), slot)
        })
    }

    pub(crate) fn close_connection(&self, conn: ConnectionRef) -> Result<()> {
        self.release(BoundaryOp::CloseConnection, |engine, slot| {
            engine.close_connection(conn.raw(), slot)
        })
    }

    pub(crate) fn close_database(&self, db: DatabaseRef) -> Result<()> {
        self.release(BoundaryOp::CloseDatabase, |engine, slot| {
            engine.close_database(db.raw(), slot)
        })
    }
}
