//! Synthetic timestamps for sources that record none.

use chrono::{DateTime, Duration, FixedOffset};

use crate::event::TrackPayload;

/// Assumed length of a track with no recorded duration.
pub const DEFAULT_TRACK_SECS: u32 = 60;

/// Whether every track lacks a real timestamp (and there is at least one).
pub fn needs_estimate(tracks: &[TrackPayload]) -> bool {
    !tracks.is_empty() && tracks.iter().all(|t| t.played_at.is_none())
}

/// Lay tracks end to end starting at `anchor`.
///
/// The first track starts exactly at `anchor`; each following track starts
/// when the previous one ends. Callers must only pass untimed tracks.
pub fn estimate_timeline(tracks: &mut [TrackPayload], anchor: DateTime<FixedOffset>) {
    let mut cursor = anchor;
    for track in tracks {
        track.played_at = Some(cursor);
        let secs = if track.duration_sec > 0 {
            track.duration_sec
        } else {
            DEFAULT_TRACK_SECS
        };
        cursor += Duration::seconds(i64::from(secs));
    }
}
