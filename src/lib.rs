//! Handle lifecycle bridge between a caller and a native database engine.
//!
//! Native resources are reached only through opaque capabilities held by
//! [`DatabaseHandle`], [`ConnectionHandle`] and [`PreparedStatement`]. Every
//! capability is released exactly once, failed construction never leaks a
//! partially built resource, and errors the engine reports out of band are
//! rebuilt into [`BridgeError`].

#![warn(missing_docs)]

pub mod db;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod types;

pub use db::{
    ConnectionHandle, DatabaseHandle, OpenOptions, OpenTarget, PreparedStatement, Session,
};
pub use error::{BridgeError, NativeError, ResourceKind, Result};
pub use ffi::{BoundaryChannel, NativeEngine};
