//! `rusqlite`-backed engine.
//!
//! Three registries map raw handles to native state:
//! - databases: location plus an anchor connection that keeps the target open
//! - connections: a `rusqlite::Connection` per handle, behind its own lock
//! - statements: the SQL compiled at prepare time
//!
//! Handles are per-engine, start at 1 and are never reused, so a stale handle
//! can only miss, never alias a newer resource.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::db::config::{clamped_millis, Location, OpenOptions, OpenTarget};
use crate::ffi::translate::{CODE_INVALID_UTF8_PAYLOAD, CODE_UNKNOWN};
use crate::ffi::{ErrorSlot, NativeEngine};
use crate::types::RawHandle;

const SQLITE_MISUSE: i32 = 21;

static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(1);

fn sqlite_error_code(err: &rusqlite::Error) -> i32 {
    match err {
        rusqlite::Error::SqliteFailure(err, _) | rusqlite::Error::SqlInputError { error: err, .. } => {
            err.extended_code
        }
        _ => CODE_UNKNOWN,
    }
}

fn raise_sqlite(errors: &mut ErrorSlot, err: &rusqlite::Error) {
    errors.raise(sqlite_error_code(err), err.to_string());
}

#[derive(Clone, Debug)]
enum Opener {
    File(PathBuf),
    SharedMemory(String),
}

impl Opener {
    fn open(&self) -> rusqlite::Result<Connection> {
        match self {
            Opener::File(path) => Connection::open_with_flags(path, OpenFlags::default()),
            Opener::SharedMemory(uri) => {
                Connection::open_with_flags(uri, OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI)
            }
        }
    }
}

struct Registry<T> {
    entries: HashMap<RawHandle, T>,
    next_id: RawHandle,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Registry<T> {
    fn insert(&mut self, entry: T) -> RawHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, entry);
        id
    }
}

struct DatabaseEntry {
    opener: Opener,
    anchor: Connection,
}

// The registry lock is only held to look entries up; SQLite work runs under
// the per-connection lock.
type ConnectionEntry = Arc<Mutex<Connection>>;

struct StatementEntry {
    conn: RawHandle,
    sql: String,
}

/// [`NativeEngine`] over bundled SQLite.
#[derive(Default)]
pub struct SqliteEngine {
    databases: Mutex<Registry<DatabaseEntry>>,
    connections: Mutex<Registry<ConnectionEntry>>,
    statements: Mutex<Registry<StatementEntry>>,
}

impl SqliteEngine {
    /// Creates an engine with empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of databases, connections and statements currently registered.
    pub fn live_counts(&self) -> (usize, usize, usize) {
        (
            self.databases.lock().entries.len(),
            self.connections.lock().entries.len(),
            self.statements.lock().entries.len(),
        )
    }
}

impl std::fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (databases, connections, statements) = self.live_counts();
        f.debug_struct("SqliteEngine")
            .field("databases", &databases)
            .field("connections", &connections)
            .field("statements", &statements)
            .finish()
    }
}

impl NativeEngine for SqliteEngine {
    fn open_database(
        &self,
        target: &OpenTarget,
        options: &OpenOptions,
        errors: &mut ErrorSlot,
    ) -> RawHandle {
        if let Some(timeout) = options.busy_timeout() {
            debug!(
                requested_ms = clamped_millis(timeout),
                "engine.sqlite.busy_timeout_ignored"
            );
        }
        let opener = match target.location() {
            Location::File(path) => Opener::File(path.clone()),
            Location::Memory => {
                let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
                Opener::SharedMemory(format!(
                    "file:limbo-bridge-mem-{}-{seq}?mode=memory&cache=shared",
                    std::process::id()
                ))
            }
        };
        match opener.open() {
            Ok(anchor) => self.databases.lock().insert(DatabaseEntry { opener, anchor }),
            Err(err) => {
                raise_sqlite(errors, &err);
                0
            }
        }
    }

    fn open_connection(&self, db: RawHandle, errors: &mut ErrorSlot) -> RawHandle {
        let opener = match self.databases.lock().entries.get(&db) {
            Some(entry) => entry.opener.clone(),
            None => {
                errors.raise(SQLITE_MISUSE, format!("invalid database handle {db}"));
                return 0;
            }
        };
        match opener.open() {
            Ok(conn) => self.connections.lock().insert(Arc::new(Mutex::new(conn))),
            Err(err) => {
                raise_sqlite(errors, &err);
                0
            }
        }
    }

    fn prepare_statement(
        &self,
        conn: RawHandle,
        sql: &[u8],
        errors: &mut ErrorSlot,
    ) -> RawHandle {
        let sql = match std::str::from_utf8(sql) {
            Ok(sql) => sql,
            Err(err) => {
                errors.raise(
                    CODE_INVALID_UTF8_PAYLOAD,
                    format!("statement is not valid UTF-8: {err}"),
                );
                return 0;
            }
        };
        let Some(entry) = self.connections.lock().entries.get(&conn).cloned() else {
            errors.raise(SQLITE_MISUSE, format!("invalid connection handle {conn}"));
            return 0;
        };
        let prepared = entry.lock().prepare(sql).map(drop);
        if let Err(err) = prepared {
            raise_sqlite(errors, &err);
            return 0;
        }
        self.statements.lock().insert(StatementEntry {
            conn,
            sql: sql.to_string(),
        })
    }

    fn close_statement(&self, stmt: RawHandle, errors: &mut ErrorSlot) {
        match self.statements.lock().entries.remove(&stmt) {
            Some(entry) => debug!(stmt, conn = entry.conn, sql = %entry.sql, "engine.sqlite.statement_closed"),
            None => errors.raise(SQLITE_MISUSE, format!("invalid statement handle {stmt}")),
        }
    }

    fn close_connection(&self, conn: RawHandle, errors: &mut ErrorSlot) {
        let Some(entry) = self.connections.lock().entries.remove(&conn) else {
            errors.raise(SQLITE_MISUSE, format!("invalid connection handle {conn}"));
            return;
        };
        // A prepare still running on another thread holds a clone; the
        // connection then closes when that call returns.
        if let Ok(conn) = Arc::try_unwrap(entry) {
            if let Err((_conn, err)) = conn.into_inner().close() {
                raise_sqlite(errors, &err);
            }
        }
    }

    fn close_database(&self, db: RawHandle, errors: &mut ErrorSlot) {
        let Some(entry) = self.databases.lock().entries.remove(&db) else {
            errors.raise(SQLITE_MISUSE, format!("invalid database handle {db}"));
            return;
        };
        if let Err((_conn, err)) = entry.anchor.close() {
            raise_sqlite(errors, &err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_handles_raise_misuse() {
        let engine = SqliteEngine::new();
        let mut slot = ErrorSlot::default();
        assert_eq!(engine.open_connection(99, &mut slot), 0);
        assert!(slot.is_raised());

        let mut slot = ErrorSlot::default();
        engine.close_database(99, &mut slot);
        assert!(slot.is_raised());
    }

    #[test]
    fn non_utf8_sql_raises_payload_error() {
        let engine = SqliteEngine::new();
        let mut slot = ErrorSlot::default();
        let db = engine.open_database(&OpenTarget::memory(), &OpenOptions::default(), &mut slot);
        assert!(db > 0);
        let conn = engine.open_connection(db, &mut slot);
        assert!(conn > 0);
        assert!(!slot.is_raised());

        let mut slot = ErrorSlot::default();
        assert_eq!(engine.prepare_statement(conn, &[0xff, 0xfe], &mut slot), 0);
        assert!(slot.is_raised());
        assert_eq!(engine.live_counts(), (1, 1, 0));
    }

    #[test]
    fn registry_is_not_locked_while_a_connection_is_busy() {
        let engine = SqliteEngine::new();
        let mut slot = ErrorSlot::default();
        let db = engine.open_database(&OpenTarget::memory(), &OpenOptions::default(), &mut slot);
        let busy = engine.open_connection(db, &mut slot);
        assert!(!slot.is_raised());

        let entry = engine
            .connections
            .lock()
            .entries
            .get(&busy)
            .cloned()
            .expect("registered connection");
        let _held = entry.lock();

        let other = engine.open_connection(db, &mut slot);
        assert!(other > 0);
        let stmt = engine.prepare_statement(other, b"SELECT 1", &mut slot);
        assert!(stmt > 0);
        engine.close_statement(stmt, &mut slot);
        engine.close_connection(other, &mut slot);
        assert!(!slot.is_raised());
        assert_eq!(engine.live_counts(), (1, 1, 0));
    }

    #[test]
    fn prepare_reports_sql_errors_and_keeps_connection() {
        let engine = SqliteEngine::new();
        let mut slot = ErrorSlot::default();
        let db = engine.open_database(&OpenTarget::memory(), &OpenOptions::default(), &mut slot);
        let conn = engine.open_connection(db, &mut slot);

        let mut slot = ErrorSlot::default();
        assert_eq!(engine.prepare_statement(conn, b"SELEC 1", &mut slot), 0);
        assert!(slot.is_raised());

        let mut slot = ErrorSlot::default();
        assert!(engine.prepare_statement(conn, b"SELECT 1", &mut slot) > 0);
        assert!(!slot.is_raised());
    }
}
