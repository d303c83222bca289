//! Extraction settings shared by every extractor.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default night cutoff (08:00 local).
pub const DEFAULT_CUTOFF: NaiveTime = match NaiveTime::from_hms_opt(8, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// Errors raised while validating configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
    #[error("serato mode must be one of auto|crate|logs, got {0:?}")]
    InvalidMode(String),
    #[error("invalid cutoff time {0:?} (expected HH:MM)")]
    InvalidCutoff(String),
}

/// Which Serato source to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Try `History` crates first, fall back to `Logs`.
    #[default]
    Auto,
    /// `History/*.crate` only.
    Crate,
    /// `Logs/*.log` and `Logs/*.txt` only.
    Logs,
}

impl ExtractMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Crate => "crate",
            Self::Logs => "logs",
        }
    }

    /// Whether the user asked for a specific source.
    #[must_use]
    pub const fn is_explicit(self) -> bool {
        !matches!(self, Self::Auto)
    }
}

impl fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "crate" => Ok(Self::Crate),
            "logs" => Ok(Self::Logs),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// Resolve an IANA timezone name. Unknown names are an error, never UTC.
pub fn resolve_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}

/// Parse a `HH:MM` (or `HH:MM:SS`) cutoff time.
pub fn parse_cutoff(value: &str) -> Result<NaiveTime, ConfigError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ConfigError::InvalidCutoff(value.to_string()))
}

/// Read-only settings threaded through every extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    pub timezone: Tz,
    pub cutoff: NaiveTime,
    pub timeline_estimate: bool,
    pub djay_root: Option<PathBuf>,
    pub serato_root: Option<PathBuf>,
    pub serato_mode: ExtractMode,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            cutoff: DEFAULT_CUTOFF,
            timeline_estimate: false,
            djay_root: None,
            serato_root: None,
            serato_mode: ExtractMode::Auto,
        }
    }
}

impl ExtractConfig {
    /// Default settings in the named timezone.
    pub fn with_timezone(name: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            timezone: resolve_timezone(name)?,
            ..Self::default()
        })
    }
}
