//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters that cannot appear in a path component on at least one platform.
const RESERVED_FS_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty or whitespace-only.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid application name.
    #[error("invalid app: {value}")]
    InvalidApp { value: String },

    /// Invalid timeline mode.
    #[error("invalid timeline mode: {value}")]
    InvalidTimelineMode { value: String },
}

/// DJ application that produced a history artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayApp {
    Djay,
    Rekordbox,
    Serato,
}

impl PlayApp {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Djay => "djay",
            Self::Rekordbox => "rekordbox",
            Self::Serato => "serato",
        }
    }
}

impl fmt::Display for PlayApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlayApp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "djay" => Ok(Self::Djay),
            "rekordbox" => Ok(Self::Rekordbox),
            "serato" => Ok(Self::Serato),
            _ => Err(ValidationError::InvalidApp {
                value: s.to_string(),
            }),
        }
    }
}

/// Where a session's timestamps came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimelineMode {
    /// Timestamps were read from the source.
    #[default]
    Actual,
    /// Timestamps were synthesized by the timeline estimator.
    Estimated,
}

impl TimelineMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Actual => "actual",
            Self::Estimated => "estimated",
        }
    }
}

impl fmt::Display for TimelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimelineMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "actual" => Ok(Self::Actual),
            "estimated" => Ok(Self::Estimated),
            _ => Err(ValidationError::InvalidTimelineMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a non-blank string newtype with common trait implementations.
///
/// Surrounding whitespace is trimmed before validation.
macro_rules! define_text {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after trimming and validation.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                if trimmed.len() == value.len() {
                    Ok(Self(value))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_text!(
    /// A validated session identifier.
    ///
    /// Session IDs are never blank. They are derived from document metadata or
    /// the source file name.
    SessionId, "session ID"
);

define_text!(
    /// A validated track title.
    ///
    /// Extractors substitute a sentinel such as "Unknown Track" before
    /// construction when the source has no title.
    TrackTitle, "title"
);

/// Replace characters that are reserved in file names.
///
/// Falls back to `"session"` when nothing usable remains.
pub fn sanitize_path_component(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| if RESERVED_FS_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = sanitized.trim();
    if trimmed.is_empty() {
        "session".to_string()
    } else {
        trimmed.to_string()
    }
}
