use parking_lot::Mutex;
use tracing::{debug, debug_span, warn, Span};

use crate::error::{BridgeError, ResourceKind, Result};
use crate::ffi::BoundaryChannel;
use crate::types::{ConnectionId, ConnectionRef, StatementRef};

/// Encodes statement text into the UTF-8 bytes sent across the boundary.
///
/// The native side treats NUL as a terminator, so text containing one cannot
/// be represented and is rejected here.
pub fn encode_sql(sql: &str) -> Result<Vec<u8>> {
    if let Some(offset) = sql.find('\0') {
        return Err(BridgeError::Encoding {
            what: "statement text",
            reason: format!("interior NUL byte at offset {offset}"),
        });
    }
    Ok(sql.as_bytes().to_vec())
}

/// Decodes UTF-16 statement text, failing on unpaired surrogates.
pub fn decode_utf16(units: &[u16]) -> Result<String> {
    String::from_utf16(units).map_err(|err| BridgeError::Encoding {
        what: "statement text",
        reason: err.to_string(),
    })
}

pub(crate) fn prepare(
    channel: &BoundaryChannel,
    conn: &ConnectionRef,
    connection: ConnectionId,
    parent: &Span,
    sql: &str,
) -> Result<PreparedStatement> {
    let bytes = encode_sql(sql)?;
    let stmt = channel
        .prepare_statement(conn, &bytes)
        .settle(|partial| channel.close_statement(partial))?;
    let span = debug_span!(parent: parent, "statement");
    debug!(parent: &span, %connection, "bridge.statement.prepared");
    Ok(PreparedStatement {
        inner: Mutex::new(Some(stmt)),
        connection,
        sql: sql.to_string(),
        channel: channel.clone(),
        span,
    })
}

/// A compiled statement owned by the caller.
///
/// Independent of other statements on the same connection. Closing is
/// idempotent; dropping an open statement closes it.
pub struct PreparedStatement {
    inner: Mutex<Option<StatementRef>>,
    connection: ConnectionId,
    sql: String,
    channel: BoundaryChannel,
    span: Span,
}

impl PreparedStatement {
    /// Connection the statement was prepared on.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    /// Statement text as given to `prepare`.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns `true` once the statement has been released.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Fails with [`BridgeError::ClosedResource`] if the statement is closed.
    pub fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BridgeError::closed(ResourceKind::Statement));
        }
        Ok(())
    }

    /// Releases the native statement. Later calls are no-ops.
    pub fn close(&self) -> Result<()> {
        let Some(stmt) = self.inner.lock().take() else {
            return Ok(());
        };
        debug!(parent: &self.span, "bridge.statement.close");
        self.channel.close_statement(stmt)
    }
}

impl std::fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("connection", &self.connection)
            .field("sql", &self.sql)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for PreparedStatement {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(parent: &self.span, error = %err, "bridge.statement.drop_close_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_rejects_interior_nul() {
        match encode_sql("SELECT 1;\0DROP TABLE t") {
            Err(BridgeError::Encoding { reason, .. }) => assert!(reason.contains("offset 9")),
            other => panic!("expected encoding error, got {other:?}"),
        }
        assert_eq!(encode_sql("SELECT 'é'").unwrap(), "SELECT 'é'".as_bytes());
    }

    #[test]
    fn decode_utf16_rejects_lone_surrogate() {
        let ok: Vec<u16> = "SELECT 1".encode_utf16().collect();
        assert_eq!(decode_utf16(&ok).unwrap(), "SELECT 1");
        let err = decode_utf16(&[0x0053, 0xD800, 0x0031]).unwrap_err();
        assert!(matches!(err, BridgeError::Encoding { .. }));
    }
}
