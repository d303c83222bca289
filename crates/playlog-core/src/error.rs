//! Extraction errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{ConfigError, ExtractMode};
use crate::types::ValidationError;

/// Errors raised while extracting sessions.
///
/// Fatal variants (see [`ExtractError::is_fatal`]) describe a configuration
/// or environment problem and abort the run. The rest are per-file and are
/// reported alongside the sessions that did extract.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Plist {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },

    #[error("invalid session in {path}: {source}")]
    Validation {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("{path} did not contain a top-level dictionary")]
    NotAContainer { path: PathBuf },

    #[error("Serato {subdir} directory not found under {root} (mode {mode})")]
    MissingSubdirectory {
        subdir: &'static str,
        root: PathBuf,
        mode: ExtractMode,
    },

    #[error("no Serato root directory found (mode {mode})")]
    MissingRoot { mode: ExtractMode },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ExtractError {
    /// Whether the error should abort the whole run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotAContainer { .. }
                | Self::MissingSubdirectory { .. }
                | Self::MissingRoot { .. }
                | Self::Config(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A source file that could not be extracted.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: ExtractError,
}
