use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn, Span};

use super::config::clamped_millis;
use super::cursor::{self, Concurrency, Holdability, ScanDirection};
use super::statement::{self, PreparedStatement};
use crate::error::{BridgeError, ResourceKind, Result};
use crate::ffi::BoundaryChannel;
use crate::types::{ConnectionId, ConnectionRef, DatabaseId};

/// A native connection derived from a [`DatabaseHandle`](super::DatabaseHandle).
///
/// The connection remembers which database it came from but does not keep
/// it alive: the caller must keep the database open for as long as the
/// connection and its statements are used. The native layer does not check
/// this.
///
/// Operations on one connection are serialized by an internal lock held for
/// the duration of each boundary call. Callers driving a connection from
/// several threads still need their own coordination for anything that spans
/// more than one call.
pub struct ConnectionHandle {
    inner: Mutex<Option<ConnectionRef>>,
    id: ConnectionId,
    database: DatabaseId,
    channel: BoundaryChannel,
    span: Span,
}

impl ConnectionHandle {
    pub(crate) fn new(
        conn: ConnectionRef,
        id: ConnectionId,
        database: DatabaseId,
        channel: BoundaryChannel,
        span: Span,
    ) -> Self {
        Self {
            inner: Mutex::new(Some(conn)),
            id,
            database,
            channel,
            span,
        }
    }

    /// Identity of this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Database this connection was opened from.
    pub fn database_id(&self) -> DatabaseId {
        self.database
    }

    /// Returns `true` once the connection has been released.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Fails with [`BridgeError::ClosedResource`] if the connection is closed.
    pub fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BridgeError::closed(ResourceKind::Connection));
        }
        Ok(())
    }

    /// Compiles `sql` into a prepared statement.
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let guard = self.inner.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| BridgeError::closed(ResourceKind::Connection))?;
        trace!(parent: &self.span, sql, "bridge.connection.prepare");
        statement::prepare(&self.channel, conn, self.id, &self.span, sql)
    }

    /// Compiles statement text supplied as UTF-16 code units.
    pub fn prepare_utf16(&self, sql: &[u16]) -> Result<PreparedStatement> {
        self.check_open()?;
        let sql = statement::decode_utf16(sql)?;
        self.prepare(&sql)
    }

    /// Busy timeout currently in effect. Always zero: timeouts are not supported.
    pub fn busy_timeout(&self) -> Duration {
        Duration::ZERO
    }

    /// Accepted for compatibility; has no effect.
    pub fn set_busy_timeout(&self, timeout: Duration) {
        trace!(
            parent: &self.span,
            requested_ms = clamped_millis(timeout),
            "bridge.connection.busy_timeout_ignored"
        );
    }

    /// Checks a requested result cursor configuration.
    pub fn check_cursor(
        &self,
        scan: ScanDirection,
        concurrency: Concurrency,
        holdability: Holdability,
    ) -> Result<()> {
        cursor::check_cursor(scan, concurrency, holdability)
    }

    /// Releases the native connection. Later calls are no-ops.
    ///
    /// The owning database stays open.
    pub fn close(&self) -> Result<()> {
        let Some(conn) = self.inner.lock().take() else {
            return Ok(());
        };
        debug!(parent: &self.span, "bridge.connection.close");
        self.channel.close_connection(conn)
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("database", &self.database)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(parent: &self.span, error = %err, "bridge.connection.drop_close_failed");
        }
    }
}
