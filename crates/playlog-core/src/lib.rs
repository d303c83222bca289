//! Core extraction and normalization of DJ play history.
//!
//! This crate contains:
//! - Extractors: djay Set `.plist` documents, Serato `.crate` history and
//!   Serato text logs
//! - Normalization: night bucketing, session assembly and timeline estimation
//! - The canonical [`PlayEvent`] / [`NightSession`] model handed to renderers

/// Version of this crate, as reported by `playlog version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod chunk;
pub mod coerce;
pub mod config;
pub mod djay;
pub mod document;
pub mod error;
pub mod event;
pub mod night;
pub mod serato;
pub mod session;
pub mod timeline;
pub mod types;

pub use config::{ConfigError, ExtractConfig, ExtractMode};
pub use error::{ExtractError, FileFailure};
pub use event::{PlayEvent, TrackPayload};
pub use night::night_date;
pub use session::{Extraction, NightSession, SessionRecord};
pub use types::{PlayApp, SessionId, TimelineMode, TrackTitle, ValidationError, sanitize_path_component};
