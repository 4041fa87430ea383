//! Handle types layered over the boundary channel.
//!
//! Lifecycle for every handle is `open -> closed`; closing is idempotent and a
//! closed handle never reopens.

pub mod config;
mod connection;
pub mod cursor;
mod database;
mod session;
mod statement;


pub use config::{Location, OpenOptions, OpenTarget};
pub use connection::ConnectionHandle;
pub use cursor::{check_cursor, Concurrency, CursorDimension, CursorMode, Holdability, ScanDirection};
pub use database::DatabaseHandle;
pub use session::Session;
pub use statement::{decode_utf16, encode_sql, PreparedStatement};
