//! Night sessions and the assembler shared by every extractor.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::coerce::local_date;
use crate::config::ExtractConfig;
use crate::error::FileFailure;
use crate::event::{PlayEvent, TrackPayload};
use crate::night::night_date;
use crate::types::{PlayApp, SessionId, TimelineMode, TrackTitle, ValidationError};

/// One session discovered in a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightSession {
    pub app: PlayApp,
    pub session_id: SessionId,
    pub night_date: NaiveDate,
    #[serde(default)]
    pub session_label: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub session_start: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub session_end: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub timeline_mode: TimelineMode,
}

/// A session together with its events, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session: NightSession,
    pub events: Vec<PlayEvent>,
}

/// Output of one extractor run.
#[derive(Debug, Default)]
pub struct Extraction {
    pub sessions: Vec<SessionRecord>,
    /// Files skipped because they could not be read or parsed.
    pub failures: Vec<FileFailure>,
}

impl Extraction {
    pub fn from_sessions(sessions: Vec<SessionRecord>) -> Self {
        Self {
            sessions,
            failures: Vec::new(),
        }
    }
}

/// Session-level facts resolved by an extractor.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub app: PlayApp,
    pub session_id: String,
    pub label: Option<String>,
    pub app_version: Option<String>,
    /// Reference instant the night date is computed from.
    pub anchor: DateTime<FixedOffset>,
    /// Explicit start recorded by the source, if any.
    pub start: Option<DateTime<FixedOffset>>,
    /// Explicit end recorded by the source, if any.
    pub end: Option<DateTime<FixedOffset>>,
    pub timeline_mode: TimelineMode,
}

/// Build a session and its events from decoded tracks.
///
/// Start and end fall back from explicit values to the earliest/latest
/// played-at, then to the anchor.
pub fn assemble(
    meta: SessionMeta,
    tracks: Vec<TrackPayload>,
    config: &ExtractConfig,
) -> Result<SessionRecord, ValidationError> {
    let tz = config.timezone;
    let session_id = SessionId::new(meta.session_id)?;
    let night = night_date(&meta.anchor, config.cutoff, tz);

    let played = tracks.iter().filter_map(|t| t.played_at);
    let earliest = played.clone().min();
    let latest = played.max();
    let start = meta.start.or(earliest).unwrap_or(meta.anchor);
    let end = meta.end.or(latest).unwrap_or(meta.anchor);

    let events = tracks
        .into_iter()
        .map(|track| -> Result<PlayEvent, ValidationError> {
            Ok(PlayEvent {
                app: meta.app,
                app_version: meta.app_version.clone(),
                session_id: session_id.clone(),
                session_date: local_date(&track.played_at.unwrap_or(start), tz),
                night_date: night,
                played_at: track.played_at,
                title: TrackTitle::new(track.title)?,
                artist: track.artist,
                album: track.album,
                duration_sec: track.duration_sec,
                deck: track.deck,
                bpm: track.bpm,
                key: track.key,
                source_path: track.source_path,
                source_track_id: track.source_track_id,
                raw: track.raw,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let session = NightSession {
        app: meta.app,
        session_id,
        night_date: night,
        session_label: meta.label,
        app_version: meta.app_version,
        session_start: Some(start),
        session_end: Some(end),
        timeline_mode: meta.timeline_mode,
    };

    Ok(SessionRecord { session, events })
}
