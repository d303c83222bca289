//! Serato history extraction.
//!
//! Serato keeps per-session history as binary `.crate` containers under
//! `History/` and, on some installs, plain text logs under `Logs/`. The
//! configured [`ExtractMode`] picks which to read; `auto` prefers history
//! and falls through to logs when history yields nothing.

pub mod history;
pub mod logs;

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

use crate::coerce::{date_hint, file_stem, modified_time};
use crate::config::{ExtractConfig, ExtractMode};
use crate::error::ExtractError;
use crate::session::Extraction;

/// Title used when a track or log line carries none.
pub const UNKNOWN_TRACK: &str = "Unknown Track";

/// Local hour assumed for a session whose date comes from its file name.
const NAME_ANCHOR_HOUR: u32 = 22;

/// One of the two Serato sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    History,
    Logs,
}

impl Source {
    /// Subdirectory of the Serato root holding this source.
    pub const fn subdir(self) -> &'static str {
        match self {
            Self::History => "History",
            Self::Logs => "Logs",
        }
    }

    pub const fn mode_name(self) -> &'static str {
        match self {
            Self::History => "crate",
            Self::Logs => "logs",
        }
    }
}

/// What to do with a source given whether its directory exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Read(Source),
    /// Directory missing under an explicit mode.
    Missing(Source),
    Skip,
}

/// Sources a mode consults, in order.
pub const fn sources(mode: ExtractMode) -> &'static [Source] {
    match mode {
        ExtractMode::Auto => &[Source::History, Source::Logs],
        ExtractMode::Crate => &[Source::History],
        ExtractMode::Logs => &[Source::Logs],
    }
}

pub const fn decide(mode: ExtractMode, source: Source, dir_exists: bool) -> Decision {
    match (dir_exists, mode.is_explicit()) {
        (true, _) => Decision::Read(source),
        (false, true) => Decision::Missing(source),
        (false, false) => Decision::Skip,
    }
}

/// Whether `auto` moves on to the next source after one produced `sessions`.
pub const fn falls_through(mode: ExtractMode, sessions: usize) -> bool {
    matches!(mode, ExtractMode::Auto) && sessions == 0
}

/// `~/Music/_Serato_` on every platform.
pub fn default_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Music").join("_Serato_"))
}

/// First existing candidate of the override and the default root.
pub fn resolve_root(override_root: Option<&Path>) -> Option<PathBuf> {
    override_root
        .map(Path::to_path_buf)
        .into_iter()
        .chain(default_root())
        .find(|candidate| candidate.is_dir())
}

/// Extract Serato sessions according to `config.serato_mode`.
pub fn extract(config: &ExtractConfig) -> Result<Extraction, ExtractError> {
    extract_at(resolve_root(config.serato_root.as_deref()).as_deref(), config)
}

/// Extract from an already resolved root, if one was found.
pub fn extract_at(
    root: Option<&Path>,
    config: &ExtractConfig,
) -> Result<Extraction, ExtractError> {
    let mode = config.serato_mode;
    let Some(root) = root else {
        if mode.is_explicit() {
            return Err(ExtractError::MissingRoot { mode });
        }
        tracing::info!(app = "serato", "serato root not found");
        return Ok(Extraction::default());
    };
    extract_from(root, mode, config)
}

/// Extract from a known Serato root.
pub fn extract_from(
    root: &Path,
    mode: ExtractMode,
    config: &ExtractConfig,
) -> Result<Extraction, ExtractError> {
    let mut extraction = Extraction::default();

    for &source in sources(mode) {
        let dir = root.join(source.subdir());
        match decide(mode, source, dir.is_dir()) {
            Decision::Read(source) => {
                let mut next = match source {
                    Source::History => history::extract_dir(&dir, config),
                    Source::Logs => logs::extract_dir(&dir, config),
                };
                tracing::info!(
                    app = "serato",
                    mode = source.mode_name(),
                    sessions = next.sessions.len(),
                    failures = next.failures.len(),
                    "serato mode selected"
                );
                // Failures from a source that fell through are still reported.
                extraction.failures.append(&mut next.failures);
                extraction.sessions = next.sessions;
                if !falls_through(mode, extraction.sessions.len()) {
                    break;
                }
            }
            Decision::Missing(source) => {
                return Err(ExtractError::MissingSubdirectory {
                    subdir: source.subdir(),
                    root: root.to_path_buf(),
                    mode,
                });
            }
            Decision::Skip => {
                tracing::debug!(dir = ?dir, "serato source directory missing");
            }
        }
    }

    Ok(extraction)
}

/// Session label: file stem with underscores as spaces.
pub(crate) fn session_label(path: &Path) -> String {
    file_stem(path).replace('_', " ")
}

/// Date in the file name at 22:00 local, else mtime, else now.
pub(crate) fn anchor_hint(path: &Path, tz: Tz) -> DateTime<FixedOffset> {
    date_hint(&file_stem(path), NAME_ANCHOR_HOUR, false, tz)
        .or_else(|| modified_time(path, tz))
        .unwrap_or_else(|| Utc::now().with_timezone(&tz).fixed_offset())
}

/// Sorted files in `dir` with any of the given extensions.
pub(crate) fn list_files(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| extensions.contains(&e))
        })
        .collect();
    files.sort();
    files
}
