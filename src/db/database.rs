use parking_lot::Mutex;
use tracing::{debug, debug_span, info_span, warn, Span};

use super::config::{OpenOptions, OpenTarget};
use super::connection::ConnectionHandle;
use crate::error::{BridgeError, ResourceKind, Result};
use crate::ffi::BoundaryChannel;
use crate::types::{ConnectionId, DatabaseId, DatabaseRef};

/// Owns a native database.
///
/// Connections spawned from the handle hold only its [`DatabaseId`]; closing
/// the database while its connections are still in use is undefined at the
/// native layer and is not detected here.
pub struct DatabaseHandle {
    inner: Mutex<Option<DatabaseRef>>,
    id: DatabaseId,
    target: OpenTarget,
    options: OpenOptions,
    channel: BoundaryChannel,
    span: Span,
}

impl DatabaseHandle {
    /// Opens `target` through `channel`.
    ///
    /// # Errors
    ///
    /// Returns the translated native error if the engine raises. If the engine
    /// handed back a handle together with the error, that handle is closed
    /// first; a failure of that close is attached as suppressed.
    pub fn open(
        channel: &BoundaryChannel,
        target: &OpenTarget,
        options: OpenOptions,
    ) -> Result<Self> {
        let span = info_span!("database", target = %target);
        Self::open_with_span(channel, target, options, span)
    }

    /// Like [`open`](Self::open), logging under a caller-supplied span.
    pub fn open_with_span(
        channel: &BoundaryChannel,
        target: &OpenTarget,
        options: OpenOptions,
        span: Span,
    ) -> Result<Self> {
        let db = channel
            .open_database(target, &options)
            .settle(|partial| {
                warn!(parent: &span, "bridge.database.open_rollback");
                channel.close_database(partial)
            })?;
        let id = DatabaseId(channel.next_id());
        debug!(parent: &span, %id, "bridge.database.open");
        Ok(Self {
            inner: Mutex::new(Some(db)),
            id,
            target: target.clone(),
            options,
            channel: channel.clone(),
            span,
        })
    }

    /// Resolves a path or locator plus string properties, then opens it.
    ///
    /// Unrecognized or malformed options fail before any native call.
    pub fn open_locator<I, K, V>(
        channel: &BoundaryChannel,
        locator: &str,
        properties: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (target, from_locator) = OpenTarget::from_arg(locator)?;
        let options = from_locator.merge(OpenOptions::from_properties(properties)?);
        Self::open(channel, &target, options)
    }

    /// Identity of this database.
    pub fn id(&self) -> DatabaseId {
        self.id
    }

    /// Target the database was opened from.
    pub fn target(&self) -> &OpenTarget {
        &self.target
    }

    /// Options the database was opened with.
    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// Returns `true` once the database has been released.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Fails with [`BridgeError::ClosedResource`] if the database is closed.
    pub fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BridgeError::closed(ResourceKind::Database));
        }
        Ok(())
    }

    /// Derives a new connection from this database.
    pub fn connect(&self) -> Result<ConnectionHandle> {
        let guard = self.inner.lock();
        let db = guard
            .as_ref()
            .ok_or_else(|| BridgeError::closed(ResourceKind::Database))?;
        let conn = self
            .channel
            .open_connection(db)
            .settle(|partial| self.channel.close_connection(partial))?;
        let id = ConnectionId(self.channel.next_id());
        let span = debug_span!(parent: &self.span, "connection", %id);
        debug!(parent: &span, database = %self.id, "bridge.connection.open");
        Ok(ConnectionHandle::new(
            conn,
            id,
            self.id,
            self.channel.clone(),
            span,
        ))
    }

    /// Releases the native database. Later calls are no-ops.
    pub fn close(&self) -> Result<()> {
        let Some(db) = self.inner.lock().take() else {
            return Ok(());
        };
        debug!(parent: &self.span, id = %self.id, "bridge.database.close");
        self.channel.close_database(db)
    }
}

impl std::fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for DatabaseHandle {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(parent: &self.span, error = %err, "bridge.database.drop_close_failed");
        }
    }
}
