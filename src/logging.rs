//! Subscriber installation for binaries. The library itself only emits events.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{BridgeError, Result};

/// Installs a `fmt` subscriber writing to stderr, filtered by `filter`
/// (for example `"warn"` or `"limbo_bridge=debug"`).
pub fn init_logging(filter: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(filter)
                .map_err(|e| BridgeError::config(format!("invalid log filter: {e}")))?,
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|_| BridgeError::config("logging already initialized"))
}
