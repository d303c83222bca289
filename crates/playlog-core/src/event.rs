//! Normalized play events.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::{PlayApp, SessionId, TrackTitle};

/// One played track, normalized across source applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub app: PlayApp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    pub session_id: SessionId,
    /// Calendar date of `played_at` (or of the session start when absent).
    pub session_date: NaiveDate,
    /// Night the owning session is filed under. Shared by every event in
    /// the session, so a play after midnight keeps the session's night.
    pub night_date: NaiveDate,
    #[serde(default)]
    pub played_at: Option<DateTime<FixedOffset>>,
    pub title: TrackTitle,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub duration_sec: u32,
    #[serde(default)]
    pub deck: Option<String>,
    #[serde(default)]
    pub bpm: Option<f64>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub source_track_id: Option<String>,
    /// Source fields as read, for traceability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

/// Track fields as decoded by an extractor, before session assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPayload {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_sec: u32,
    pub deck: Option<String>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub source_path: Option<String>,
    pub source_track_id: Option<String>,
    pub played_at: Option<DateTime<FixedOffset>>,
    pub raw: Option<serde_json::Value>,
}

impl TrackPayload {
    /// Payload with only a title; the remaining fields take their defaults.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}
