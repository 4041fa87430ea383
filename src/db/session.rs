use super::config::{OpenOptions, OpenTarget};
use super::connection::ConnectionHandle;
use super::database::DatabaseHandle;
use super::statement::PreparedStatement;
use crate::error::Result;
use crate::ffi::BoundaryChannel;

/// A database opened together with one connection.
///
/// Construction is all-or-nothing: if connecting fails, the database is
/// closed before the error is returned. The session owns both handles and
/// releases the connection before the database.
#[derive(Debug)]
pub struct Session {
    // Field order matters: the connection must drop before the database.
    connection: ConnectionHandle,
    database: DatabaseHandle,
}

impl Session {
    /// Opens `target` and connects to it.
    pub fn open(
        channel: &BoundaryChannel,
        target: &OpenTarget,
        options: OpenOptions,
    ) -> Result<Self> {
        let database = DatabaseHandle::open(channel, target, options)?;
        Self::connect(database)
    }

    /// Opens a path or locator with string properties and connects to it.
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
        let database = DatabaseHandle::open_locator(channel, locator, properties)?;
        Self::connect(database)
    }

    fn connect(database: DatabaseHandle) -> Result<Self> {
        match database.connect() {
            Ok(connection) => Ok(Self {
                connection,
                database,
            }),
            Err(err) => match database.close() {
                Ok(()) => Err(err),
                Err(cleanup) => Err(err.with_suppressed(cleanup)),
            },
        }
    }

    /// The owned database.
    pub fn database(&self) -> &DatabaseHandle {
        &self.database
    }

    /// The owned connection.
    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    /// Prepares `sql` on the session's connection.
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        self.connection.prepare(sql)
    }

    /// Returns `true` once the database has been closed.
    pub fn is_closed(&self) -> bool {
        self.database.is_closed()
    }

    /// Closes the connection, then the database.
    ///
    /// The database is closed even if closing the connection fails; the
    /// connection error is returned with any database error attached.
    pub fn close(&self) -> Result<()> {
        let conn = self.connection.close();
        let db = self.database.close();
        match (conn, db) {
            (Ok(()), db) => db,
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => Err(err.with_suppressed(cleanup)),
        }
    }
}
