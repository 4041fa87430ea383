//! Result cursor capability checks.
//!
//! Exactly one cursor configuration is supported: forward-only scan,
//! read-only concurrency, cursors closed at commit.

use std::fmt;

use crate::error::{BridgeError, Result};

/// One of the three cursor configuration dimensions.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CursorDimension {
    /// Scan direction / scrollability.
    ScanDirection,
    /// Concurrency mode.
    Concurrency,
    /// Holdability across commits.
    Holdability,
}

impl fmt::Display for CursorDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CursorDimension::ScanDirection => "scan direction",
            CursorDimension::Concurrency => "concurrency",
            CursorDimension::Holdability => "holdability",
        })
    }
}

/// Requested scan direction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScanDirection {
    /// Rows can only be read once, in order.
    ForwardOnly,
    /// Scrollable, insensitive to concurrent changes.
    ScrollInsensitive,
    /// Scrollable, sensitive to concurrent changes.
    ScrollSensitive,
}

/// Requested concurrency mode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Concurrency {
    /// Rows cannot be updated through the cursor.
    ReadOnly,
    /// Rows can be updated through the cursor.
    Updatable,
}

/// Requested holdability.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Holdability {
    /// Cursors are closed when the transaction commits.
    CloseAtCommit,
    /// Cursors stay open across commits.
    HoldOverCommit,
}

impl ScanDirection {
    /// Maps the managed caller's raw constant (`1003`, `1004`, `1005`).
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            1003 => Ok(ScanDirection::ForwardOnly),
            1004 => Ok(ScanDirection::ScrollInsensitive),
            1005 => Ok(ScanDirection::ScrollSensitive),
            other => Err(unsupported(CursorDimension::ScanDirection, format!("raw value {other}"))),
        }
    }
}

impl Concurrency {
    /// Maps the managed caller's raw constant (`1007`, `1008`).
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            1007 => Ok(Concurrency::ReadOnly),
            1008 => Ok(Concurrency::Updatable),
            other => Err(unsupported(CursorDimension::Concurrency, format!("raw value {other}"))),
        }
    }
}

impl Holdability {
    /// Maps the managed caller's raw constant (`1` hold, `2` close).
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            1 => Ok(Holdability::HoldOverCommit),
            2 => Ok(Holdability::CloseAtCommit),
            other => Err(unsupported(CursorDimension::Holdability, format!("raw value {other}"))),
        }
    }
}

/// A full cursor configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CursorMode {
    /// Scan direction.
    pub scan: ScanDirection,
    /// Concurrency mode.
    pub concurrency: Concurrency,
    /// Holdability.
    pub holdability: Holdability,
}

impl Default for CursorMode {
    fn default() -> Self {
        Self {
            scan: ScanDirection::ForwardOnly,
            concurrency: Concurrency::ReadOnly,
            holdability: Holdability::CloseAtCommit,
        }
    }
}

impl CursorMode {
    /// Builds a mode from raw constants, then validates it.
    pub fn from_raw(scan: i32, concurrency: i32, holdability: i32) -> Result<Self> {
        let mode = Self {
            scan: ScanDirection::from_raw(scan)?,
            concurrency: Concurrency::from_raw(concurrency)?,
            holdability: Holdability::from_raw(holdability)?,
        };
        mode.validate()?;
        Ok(mode)
    }

    /// Rejects anything but the supported combination.
    pub fn validate(&self) -> Result<()> {
        check_cursor(self.scan, self.concurrency, self.holdability)
    }
}

/// Checks a cursor request, naming the first rejected dimension.
///
/// Pure precondition: no native interaction.
pub fn check_cursor(
    scan: ScanDirection,
    concurrency: Concurrency,
    holdability: Holdability,
) -> Result<()> {
    if scan != ScanDirection::ForwardOnly {
        return Err(unsupported(CursorDimension::ScanDirection, format!("{scan:?}")));
    }
    if concurrency != Concurrency::ReadOnly {
        return Err(unsupported(CursorDimension::Concurrency, format!("{concurrency:?}")));
    }
    if holdability != Holdability::CloseAtCommit {
        return Err(unsupported(CursorDimension::Holdability, format!("{holdability:?}")));
    }
    Ok(())
}

fn unsupported(dimension: CursorDimension, requested: String) -> BridgeError {
    let supported = match dimension {
        CursorDimension::ScanDirection => "ForwardOnly",
        CursorDimension::Concurrency => "ReadOnly",
        CursorDimension::Holdability => "CloseAtCommit",
    };
    BridgeError::UnsupportedCursorMode {
        dimension,
        requested,
        supported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected_dimension(result: Result<()>) -> CursorDimension {
        match result {
            Err(BridgeError::UnsupportedCursorMode { dimension, .. }) => dimension,
            other => panic!("expected unsupported cursor mode, got {other:?}"),
        }
    }

    #[test]
    fn accepts_only_supported_combination() {
        check_cursor(
            ScanDirection::ForwardOnly,
            Concurrency::ReadOnly,
            Holdability::CloseAtCommit,
        )
        .expect("supported mode");
        CursorMode::default().validate().expect("default mode");
    }

    #[test]
    fn names_rejected_dimension() {
        let dim = rejected_dimension(check_cursor(
            ScanDirection::ScrollInsensitive,
            Concurrency::ReadOnly,
            Holdability::CloseAtCommit,
        ));
        assert_eq!(dim, CursorDimension::ScanDirection);

        let dim = rejected_dimension(check_cursor(
            ScanDirection::ForwardOnly,
            Concurrency::Updatable,
            Holdability::CloseAtCommit,
        ));
        assert_eq!(dim, CursorDimension::Concurrency);

        let dim = rejected_dimension(check_cursor(
            ScanDirection::ForwardOnly,
            Concurrency::ReadOnly,
            Holdability::HoldOverCommit,
        ));
        assert_eq!(dim, CursorDimension::Holdability);
    }

    #[test]
    fn raw_constants() {
        let mode = CursorMode::from_raw(1003, 1007, 2).expect("supported raw mode");
        assert_eq!(mode, CursorMode::default());
        let err = CursorMode::from_raw(1004, 1007, 2).unwrap_err();
        assert!(err.to_string().contains("scan direction"), "{err}");
        let dim = rejected_dimension(CursorMode::from_raw(1003, 42, 2).map(|_| ()));
        assert_eq!(dim, CursorDimension::Concurrency);
    }
}
