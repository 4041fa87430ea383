//! Native engines that can sit behind a [`BoundaryChannel`](crate::ffi::BoundaryChannel).

mod sqlite;

pub use sqlite::SqliteEngine;
