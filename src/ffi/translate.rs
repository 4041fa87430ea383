//! Translation of raw native errors into [`NativeError`].

use std::fmt;

use crate::error::NativeError;

/// Generic failure with no more specific code.
pub const CODE_UNKNOWN: i32 = -1;
/// The native side could not parse a byte array handed to it.
pub const CODE_INVALID_UTF8_PAYLOAD: i32 = 1100;
/// The native side failed to prepare a statement for a non-SQL reason.
pub const CODE_PREPARE_FAILED: i32 = 1200;
/// Catch-all bridge code.
pub const CODE_OTHER: i32 = 9999;

/// Classification of a native result code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum NativeErrorKind {
    Error,
    Internal,
    Permission,
    Abort,
    Busy,
    Locked,
    NoMemory,
    ReadOnly,
    Interrupt,
    IoError,
    Corrupt,
    NotFound,
    Full,
    CantOpen,
    Protocol,
    Empty,
    Schema,
    TooBig,
    Constraint,
    Mismatch,
    Misuse,
    NoLfs,
    Auth,
    Format,
    Range,
    NotADatabase,
    Unknown,
    InvalidUtf8Payload,
    PrepareFailed,
    Other,
    /// A code outside every known table.
    Unrecognized,
}

impl NativeErrorKind {
    /// Classifies `code`. Bridge codes match exactly; everything else is
    /// classified by its primary (low) byte so extended codes share a kind.
    pub fn from_code(code: i32) -> Self {
        match code {
            CODE_UNKNOWN => return NativeErrorKind::Unknown,
            CODE_INVALID_UTF8_PAYLOAD => return NativeErrorKind::InvalidUtf8Payload,
            CODE_PREPARE_FAILED => return NativeErrorKind::PrepareFailed,
            CODE_OTHER => return NativeErrorKind::Other,
            c if c <= 0 => return NativeErrorKind::Unrecognized,
            _ => {}
        }
        match code & 0xff {
            1 => NativeErrorKind::Error,
            2 => NativeErrorKind::Internal,
            3 => NativeErrorKind::Permission,
            4 => NativeErrorKind::Abort,
            5 => NativeErrorKind::Busy,
            6 => NativeErrorKind::Locked,
            7 => NativeErrorKind::NoMemory,
            8 => NativeErrorKind::ReadOnly,
            9 => NativeErrorKind::Interrupt,
            10 => NativeErrorKind::IoError,
            11 => NativeErrorKind::Corrupt,
            12 => NativeErrorKind::NotFound,
            13 => NativeErrorKind::Full,
            14 => NativeErrorKind::CantOpen,
            15 => NativeErrorKind::Protocol,
            16 => NativeErrorKind::Empty,
            17 => NativeErrorKind::Schema,
            18 => NativeErrorKind::TooBig,
            19 => NativeErrorKind::Constraint,
            20 => NativeErrorKind::Mismatch,
            21 => NativeErrorKind::Misuse,
            22 => NativeErrorKind::NoLfs,
            23 => NativeErrorKind::Auth,
            24 => NativeErrorKind::Format,
            25 => NativeErrorKind::Range,
            26 => NativeErrorKind::NotADatabase,
            _ => NativeErrorKind::Unrecognized,
        }
    }

    /// Returns the symbolic name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NativeErrorKind::Error => "SQLITE_ERROR",
            NativeErrorKind::Internal => "SQLITE_INTERNAL",
            NativeErrorKind::Permission => "SQLITE_PERM",
            NativeErrorKind::Abort => "SQLITE_ABORT",
            NativeErrorKind::Busy => "SQLITE_BUSY",
            NativeErrorKind::Locked => "SQLITE_LOCKED",
            NativeErrorKind::NoMemory => "SQLITE_NOMEM",
            NativeErrorKind::ReadOnly => "SQLITE_READONLY",
            NativeErrorKind::Interrupt => "SQLITE_INTERRUPT",
            NativeErrorKind::IoError => "SQLITE_IOERR",
            NativeErrorKind::Corrupt => "SQLITE_CORRUPT",
            NativeErrorKind::NotFound => "SQLITE_NOTFOUND",
            NativeErrorKind::Full => "SQLITE_FULL",
            NativeErrorKind::CantOpen => "SQLITE_CANTOPEN",
            NativeErrorKind::Protocol => "SQLITE_PROTOCOL",
            NativeErrorKind::Empty => "SQLITE_EMPTY",
            NativeErrorKind::Schema => "SQLITE_SCHEMA",
            NativeErrorKind::TooBig => "SQLITE_TOOBIG",
            NativeErrorKind::Constraint => "SQLITE_CONSTRAINT",
            NativeErrorKind::Mismatch => "SQLITE_MISMATCH",
            NativeErrorKind::Misuse => "SQLITE_MISUSE",
            NativeErrorKind::NoLfs => "SQLITE_NOLFS",
            NativeErrorKind::Auth => "SQLITE_AUTH",
            NativeErrorKind::Format => "SQLITE_FORMAT",
            NativeErrorKind::Range => "SQLITE_RANGE",
            NativeErrorKind::NotADatabase => "SQLITE_NOTADB",
            NativeErrorKind::Unknown => "UNKNOWN_ERROR",
            NativeErrorKind::InvalidUtf8Payload => "FAILED_TO_PARSE_BYTE_ARRAY",
            NativeErrorKind::PrepareFailed => "FAILED_TO_PREPARE_STATEMENT",
            NativeErrorKind::Other => "ETC",
            NativeErrorKind::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl fmt::Display for NativeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a [`NativeError`] from a raw code and message bytes.
///
/// Never fails: invalid UTF-8 is decoded with replacement characters so a
/// broken message cannot hide the error it describes.
pub fn translate(code: i32, message: &[u8]) -> NativeError {
    NativeError {
        code,
        kind: NativeErrorKind::from_code(code),
        message: String::from_utf8_lossy(message).into_owned(),
    }
}
