//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use playlog_core::config::{parse_cutoff, resolve_timezone};
use playlog_core::{ConfigError, ExtractConfig, ExtractMode};
use serde::{Deserialize, Serialize};

use crate::cli::RunArgs;
use crate::render::Format as OutputFormat;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the written archive.
    pub out_dir: PathBuf,
    pub formats: Vec<OutputFormat>,
    /// Night cutoff, `HH:MM`.
    pub cutoff: String,
    /// IANA timezone name.
    pub timezone: String,
    #[serde(default)]
    pub timeline_estimate: bool,
    #[serde(default)]
    pub djay_root: Option<PathBuf>,
    #[serde(default)]
    pub serato_root: Option<PathBuf>,
    pub serato_mode: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            formats: OutputFormat::ALL.to_vec(),
            cutoff: "08:00".to_string(),
            timezone: "UTC".to_string(),
            timeline_estimate: false,
            djay_root: None,
            serato_root: None,
            serato_mode: ExtractMode::Auto.as_str().to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // PLAYLOG_* environment variables
        figment = figment.merge(Env::prefixed("PLAYLOG_"));

        figment.extract()
    }

    /// Apply command-line overrides on top of the loaded values.
    #[must_use]
    pub fn with_run_args(mut self, args: &RunArgs) -> Self {
        if let Some(out) = &args.out {
            self.out_dir.clone_from(out);
        }
        if let Some(formats) = &args.formats {
            self.formats = formats
                .iter()
                .filter_map(|name| match name.parse() {
                    Ok(format) => Some(format),
                    Err(e) => {
                        tracing::warn!(format = %name, error = %e, "ignoring output format");
                        None
                    }
                })
                .collect();
        }
        if let Some(tz) = &args.tz {
            self.timezone.clone_from(tz);
        }
        if let Some(cutoff) = &args.cutoff {
            self.cutoff.clone_from(cutoff);
        }
        if let Some(mode) = &args.serato_mode {
            self.serato_mode.clone_from(mode);
        }
        if args.serato_root.is_some() {
            self.serato_root.clone_from(&args.serato_root);
        }
        if args.djay_root.is_some() {
            self.djay_root.clone_from(&args.djay_root);
        }
        self.timeline_estimate |= args.timeline_estimate;
        self
    }

    /// Validate into the settings the extractors read.
    pub fn extract_config(&self) -> Result<ExtractConfig, ConfigError> {
        Ok(ExtractConfig {
            timezone: resolve_timezone(&self.timezone)?,
            cutoff: parse_cutoff(&self.cutoff)?,
            timeline_estimate: self.timeline_estimate,
            djay_root: self.djay_root.clone(),
            serato_root: self.serato_root.clone(),
            serato_mode: self.serato_mode.parse()?,
        })
    }
}

/// Returns the platform-specific config directory for playlog.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("playlog"))
}

/// `~/Desktop/PlayLog Archives`, or the working directory without a desktop.
fn default_out_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("PlayLog Archives")
}
