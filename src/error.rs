//! Error types surfaced to callers of the bridge.

use std::fmt;

use thiserror::Error;

use crate::db::cursor::CursorDimension;
use crate::ffi::translate::NativeErrorKind;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// The kind of handle an operation was attempted on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    /// A [`DatabaseHandle`](crate::db::DatabaseHandle).
    Database,
    /// A [`ConnectionHandle`](crate::db::ConnectionHandle).
    Connection,
    /// A [`PreparedStatement`](crate::db::PreparedStatement).
    Statement,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Database => "database",
            ResourceKind::Connection => "database connection",
            ResourceKind::Statement => "prepared statement",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the bridge.
///
/// Every variant reaches the immediate caller; nothing is retried or swallowed.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid or unrecognized open target or option, detected before any native call.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Text could not be converted to its wire representation.
    #[error("failed to encode {what}: {reason}")]
    Encoding {
        /// What was being encoded.
        what: &'static str,
        /// Why the encoding failed.
        reason: String,
    },
    /// Error reported by the native engine through the out-of-band channel.
    #[error(transparent)]
    Native(#[from] NativeError),
    /// The handle was already closed.
    #[error("{resource} closed")]
    ClosedResource {
        /// Kind of handle that was closed.
        resource: ResourceKind,
    },
    /// Requested cursor configuration is outside the supported combination.
    #[error("unsupported cursor {dimension}: {requested} (only {supported} is supported)")]
    UnsupportedCursorMode {
        /// The dimension that was rejected.
        dimension: CursorDimension,
        /// Human readable description of the requested value.
        requested: String,
        /// Human readable description of the only accepted value.
        supported: &'static str,
    },
    /// A primary failure together with failures raised while cleaning up after it.
    #[error("{primary} ({} suppressed)", .suppressed.len())]
    Suppressed {
        /// The error that caused the cleanup.
        primary: Box<BridgeError>,
        /// Cleanup failures, in the order they occurred.
        suppressed: Vec<BridgeError>,
    },
}

impl BridgeError {
    pub(crate) fn closed(resource: ResourceKind) -> Self {
        BridgeError::ClosedResource { resource }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        BridgeError::Configuration(message.into())
    }

    /// Returns the native result code, if this error came from the engine.
    pub fn code(&self) -> Option<i32> {
        match self.primary() {
            BridgeError::Native(err) => Some(err.code),
            _ => None,
        }
    }

    /// The error that caused any cleanup, with suppressed failures stripped.
    pub fn primary(&self) -> &BridgeError {
        match self {
            BridgeError::Suppressed { primary, .. } => primary.as_ref(),
            other => other,
        }
    }

    /// Secondary failures attached while cleaning up after this error.
    pub fn suppressed(&self) -> &[BridgeError] {
        match self {
            BridgeError::Suppressed { suppressed, .. } => suppressed,
            _ => &[],
        }
    }

    /// Attaches a cleanup failure without replacing the primary error.
    pub(crate) fn with_suppressed(self, cleanup: BridgeError) -> Self {
        match self {
            BridgeError::Suppressed {
                primary,
                mut suppressed,
            } => {
                suppressed.push(cleanup);
                BridgeError::Suppressed {
                    primary,
                    suppressed,
                }
            }
            primary => BridgeError::Suppressed {
                primary: Box::new(primary),
                suppressed: vec![cleanup],
            },
        }
    }
}

/// Error decoded from the native side's out-of-band error channel.
#[derive(Debug)]
pub struct NativeError {
    /// Raw result code as delivered by the engine.
    pub code: i32,
    /// Classification of `code`.
    pub kind: NativeErrorKind,
    /// Decoded message (lossy UTF-8).
    pub message: String,
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (code {})", self.kind, self.message, self.code)
    }
}

impl std::error::Error for NativeError {}
