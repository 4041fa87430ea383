//! Open target descriptor and recognized option set.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BridgeError, Result};

/// Locator prefixes accepted by [`OpenTarget::parse`].
pub const URL_PREFIXES: &[&str] = &["jdbc:sqlite:", "sqlite:"];

/// Option keys accepted by [`OpenOptions::set`].
pub const RECOGNIZED_OPTIONS: &[&str] = &["busy_timeout"];

const MEMORY: &str = ":memory:";

/// Where the native engine should open the database.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Location {
    /// A private in-memory database.
    Memory,
    /// A database file.
    File(PathBuf),
}

/// Validated open target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OpenTarget {
    locator: String,
    location: Location,
}

impl OpenTarget {
    /// Targets a database file, or an in-memory database for `":memory:"`.
    pub fn path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.to_string_lossy().into_owned();
        if display.is_empty() {
            return Err(BridgeError::config("database path must not be empty"));
        }
        if display.contains('\0') {
            return Err(BridgeError::config(format!(
                "database path {display:?} contains a NUL byte"
            )));
        }
        let location = if display == MEMORY {
            Location::Memory
        } else {
            Location::File(path.to_path_buf())
        };
        Ok(Self {
            locator: display,
            location,
        })
    }

    /// Targets a private in-memory database.
    pub fn memory() -> Self {
        Self {
            locator: MEMORY.to_string(),
            location: Location::Memory,
        }
    }

    /// Parses a locator such as `jdbc:sqlite:/tmp/app.db?busy_timeout=100`.
    ///
    /// Query parameters are returned as options and validated like any other
    /// property.
    pub fn parse(url: &str) -> Result<(Self, OpenOptions)> {
        let rest = URL_PREFIXES
            .iter()
            .find_map(|prefix| url.strip_prefix(prefix))
            .ok_or_else(|| {
                BridgeError::config(format!(
                    "unsupported locator '{url}', expected one of {}",
                    URL_PREFIXES.join(", ")
                ))
            })?;
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        let mut options = OpenOptions::default();
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                BridgeError::config(format!("malformed locator parameter '{pair}'"))
            })?;
            options.set(key, value)?;
        }
        Ok((Self::path(path)?, options))
    }

    /// Parses `value` as a locator if it has a known prefix, otherwise as a path.
    pub fn from_arg(value: &str) -> Result<(Self, OpenOptions)> {
        if URL_PREFIXES.iter().any(|prefix| value.starts_with(prefix)) {
            Self::parse(value)
        } else {
            Ok((Self::path(value)?, OpenOptions::default()))
        }
    }

    /// Resolved location.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The path or locator as given.
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl fmt::Display for OpenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator)
    }
}

/// Recognized open options.
///
/// `busy_timeout` is accepted and validated but not applied by the bridge.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenOptions {
    #[serde(default, rename = "busy_timeout")]
    busy_timeout_ms: Option<u64>,
}

impl OpenOptions {
    /// Builds options from string properties, rejecting unknown keys.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in properties {
            options.set(key.as_ref(), value.as_ref())?;
        }
        Ok(options)
    }

    /// Parses options from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| BridgeError::config(format!("invalid options: {err}")))
    }

    /// Sets a single option from its string form.
    ///
    /// Keys are matched exactly, as in TOML documents.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "busy_timeout" => {
                self.busy_timeout_ms = Some(parse_u64(value, "busy_timeout")?);
                Ok(())
            }
            other => Err(BridgeError::config(format!(
                "unrecognized option '{other}', expected one of {}",
                RECOGNIZED_OPTIONS.join(", ")
            ))),
        }
    }

    /// Sets the reserved busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = Some(clamped_millis(timeout));
        self
    }

    /// Requested busy timeout, if any.
    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout_ms.map(Duration::from_millis)
    }

    /// Overlays `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: OpenOptions) -> Self {
        Self {
            busy_timeout_ms: other.busy_timeout_ms.or(self.busy_timeout_ms),
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn clamped_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_u64(value: &str, field: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        BridgeError::config(format!(
            "option {field} requires a non-negative integer, got '{value}'"
        ))
    })
}
