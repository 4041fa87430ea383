//! Opaque capability tokens and diagnostic identifiers.
//!
//! A capability identifies a resource owned by the native engine. Only the
//! boundary channel can read the raw value; everything else holds the token
//! and hands it back. Tokens are neither `Copy` nor `Clone`, and the close
//! calls consume them, so a released capability cannot be used again.

use std::fmt;
use std::num::NonZeroI64;

/// Raw value exchanged with the native engine. Zero means "no handle".
pub type RawHandle = i64;

macro_rules! define_capability {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Eq, PartialEq)]
        pub struct $name(NonZeroI64);

        impl $name {
            pub(crate) fn from_raw(raw: NonZeroI64) -> Self {
                Self(raw)
            }

            pub(crate) fn raw(&self) -> RawHandle {
                self.0.get()
            }
        }
    };
}

define_capability!(
    /// Native database capability.
    DatabaseRef
);
define_capability!(
    /// Native connection capability, scoped to a database capability.
    ConnectionRef
);
define_capability!(
    /// Native prepared-statement capability, scoped to a connection capability.
    StatementRef
);

/// Identity of an opened database, used for diagnostics and ownership checks.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DatabaseId(pub u64);

/// Identity of a connection, used for diagnostics and ownership checks.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ConnectionId(pub u64);

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db#{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}
