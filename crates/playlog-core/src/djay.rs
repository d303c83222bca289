//! djay Set history (`.plist`) extraction.
//!
//! Set documents differ between djay versions: tracks sit under varying
//! container keys at varying depths and field names drift. Tracks are found
//! by shape (a title key plus at least one other track-ish key) rather than
//! by path, and each field is read through an ordered alias list.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

use crate::coerce::{
    coerce_float, coerce_int, coerce_timestamp, date_hint, file_stem, modified_time, node_to_text,
};
use crate::config::ExtractConfig;
use crate::document::{Node, NodeMap};
use crate::error::{ExtractError, FileFailure};
use crate::event::TrackPayload;
use crate::session::{Extraction, SessionMeta, SessionRecord, assemble};
use crate::types::{PlayApp, TimelineMode};

/// Keys under which djay versions have stored track lists.
pub const TRACK_LIST_KEYS: &[&str] = &[
    "History Tracks",
    "HistoryTracks",
    "Tracks",
    "Track Entries",
    "Root",
];

pub const TITLE_KEYS: &[&str] = &["Song Title", "Title", "Name", "Track Title"];
pub const ARTIST_KEYS: &[&str] = &["Artist", "Song Artist"];
pub const ALBUM_KEYS: &[&str] = &["Album", "Song Album"];
pub const START_KEYS: &[&str] = &["Start Time", "StartTime", "Played At", "Play Time", "Date"];
pub const END_KEYS: &[&str] = &["End Time", "EndTime", "Stop Time", "Date Ended"];
pub const DECK_KEYS: &[&str] = &["Deck", "Deck Name", "DeckName"];
pub const DURATION_KEYS: &[&str] = &["Duration", "Track Duration", "Play Duration", "Playtime"];
pub const BPM_KEYS: &[&str] = &["BPM", "Tempo"];
pub const KEY_KEYS: &[&str] = &["Key", "Musical Key"];
pub const SOURCE_PATH_KEYS: &[&str] = &["Location", "File Path", "URI"];
pub const TRACK_ID_KEYS: &[&str] = &["Persistent ID", "PersistentID", "Track ID"];

pub const SESSION_ID_KEYS: &[&str] = &["History Name", "Session Name", "Name", "Title"];
pub const SESSION_LABEL_KEYS: &[&str] = &["History Name", "Venue", "Comments"];
pub const SESSION_START_KEYS: &[&str] = &["Date Started", "Session Start", "Start Time", "StartTime"];
pub const SESSION_END_KEYS: &[&str] = &["Date Ended", "Session End", "End Time", "EndTime"];
pub const APP_VERSION_KEYS: &[&str] = &["Software Version", "App Version", "Version"];

/// Keys whose presence next to a title marks a map as a track.
const TRACK_HINT_KEYS: &[&[&str]] = &[
    ARTIST_KEYS,
    START_KEYS,
    END_KEYS,
    DECK_KEYS,
    DURATION_KEYS,
    BPM_KEYS,
    KEY_KEYS,
    SOURCE_PATH_KEYS,
];

const UNKNOWN_TITLE: &str = "Unknown Title";

/// Local hour used when a session date comes from the file name.
const FILENAME_ANCHOR_HOUR: u32 = 12;

/// Default djay Sets directory (same layout on macOS and Windows).
pub fn default_roots() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| vec![home.join("Music").join("djay").join("History").join("Sets")])
        .unwrap_or_default()
}

/// Find `.plist` files under the given roots, sorted and de-duplicated.
///
/// A root may also name a single `.plist` file. Missing roots are skipped.
pub fn discover_plists(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for root in roots {
        if root.is_file() {
            if is_plist(root) {
                found.push(root.clone());
            }
            continue;
        }
        let Ok(entries) = fs::read_dir(root) else {
            tracing::debug!(root = ?root, "djay root not readable");
            continue;
        };
        found.extend(
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_plist(p)),
        );
    }
    found.sort();
    found.dedup();
    found
}

fn is_plist(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "plist")
}

/// Extract every session under the configured (or default) roots.
///
/// Unreadable or unparseable files are collected as failures; a document
/// without a top-level dictionary aborts the run.
pub fn extract(config: &ExtractConfig) -> Result<Extraction, ExtractError> {
    let roots = config
        .djay_root
        .as_ref()
        .map_or_else(default_roots, |root| vec![root.clone()]);
    extract_from(&roots, config)
}

/// Extract every session under explicit roots.
pub fn extract_from(roots: &[PathBuf], config: &ExtractConfig) -> Result<Extraction, ExtractError> {
    let mut extraction = Extraction::default();

    for path in discover_plists(roots) {
        match load_session(&path, config) {
            Ok(record) => extraction.sessions.push(record),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "skipping djay set");
                extraction.failures.push(FileFailure { path, error: e });
            }
        }
    }

    tracing::info!(
        app = "djay",
        sessions = extraction.sessions.len(),
        failures = extraction.failures.len(),
        "djay extraction finished"
    );
    Ok(extraction)
}

/// Load one `.plist` Set file and normalize it.
pub fn load_session(path: &Path, config: &ExtractConfig) -> Result<SessionRecord, ExtractError> {
    let bytes = fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    let value = plist::Value::from_reader(Cursor::new(bytes)).map_err(|source| {
        ExtractError::Plist {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let Node::Map(root) = Node::from(value) else {
        return Err(ExtractError::NotAContainer {
            path: path.to_path_buf(),
        });
    };

    session_from_document(&root, path, config).map_err(|source| ExtractError::Validation {
        path: path.to_path_buf(),
        source,
    })
}

/// Normalize an already-parsed document.
///
/// `path` supplies the fallback session name and anchor date.
pub fn session_from_document(
    root: &NodeMap,
    path: &Path,
    config: &ExtractConfig,
) -> Result<SessionRecord, crate::types::ValidationError> {
    let tz = config.timezone;
    let stem = file_stem(path);

    let session_id = first_str(root, SESSION_ID_KEYS).unwrap_or_else(|| stem.clone());
    let label = first_str(root, SESSION_LABEL_KEYS).unwrap_or_else(|| stem.clone());
    let app_version = first_str(root, APP_VERSION_KEYS);

    let tracks: Vec<TrackPayload> = find_tracks(root)
        .into_iter()
        .map(|track| track_payload(track, tz))
        .collect();

    let explicit_start = earliest_datetime(root, SESSION_START_KEYS, tz);
    let explicit_end = first_datetime(root, SESSION_END_KEYS, tz);
    let earliest_played = tracks.iter().filter_map(|t| t.played_at).min();

    let anchor = explicit_start
        .or(earliest_played)
        .or_else(|| date_hint(&stem, FILENAME_ANCHOR_HOUR, true, tz))
        .or_else(|| modified_time(path, tz))
        .unwrap_or_else(|| Utc::now().with_timezone(&tz).fixed_offset());

    tracing::debug!(
        path = ?path,
        session_id = %session_id,
        tracks = tracks.len(),
        "parsed djay set"
    );

    assemble(
        SessionMeta {
            app: PlayApp::Djay,
            session_id,
            label: Some(label),
            app_version,
            anchor,
            start: explicit_start,
            end: explicit_end,
            timeline_mode: TimelineMode::Actual,
        },
        tracks,
        config,
    )
}

/// Every track-like map in the tree, in document order.
pub fn find_tracks(root: &NodeMap) -> Vec<&NodeMap> {
    let mut tracks = Vec::new();
    collect_tracks_in_map(root, &mut tracks);
    tracks
}

fn collect_tracks<'a>(node: &'a Node, out: &mut Vec<&'a NodeMap>) {
    match node {
        Node::List(items) => {
            for item in items {
                collect_tracks(item, out);
            }
        }
        Node::Map(map) => collect_tracks_in_map(map, out),
        _ => {}
    }
}

fn collect_tracks_in_map<'a>(map: &'a NodeMap, out: &mut Vec<&'a NodeMap>) {
    if looks_like_track(map) {
        out.push(map);
        return;
    }
    for (_, value) in map.iter() {
        collect_tracks(value, out);
    }
}

/// A title key plus at least one hint key.
pub fn looks_like_track(map: &NodeMap) -> bool {
    let has_title = TITLE_KEYS.iter().any(|k| map.contains_key(k));
    let has_hint = TRACK_HINT_KEYS
        .iter()
        .flat_map(|keys| keys.iter())
        .any(|k| map.contains_key(k));
    has_title && has_hint
}

fn track_payload(track: &NodeMap, tz: Tz) -> TrackPayload {
    TrackPayload {
        title: first_str(track, TITLE_KEYS).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        artist: first_str(track, ARTIST_KEYS).unwrap_or_default(),
        album: first_str(track, ALBUM_KEYS).unwrap_or_default(),
        duration_sec: coerce_int(first_value(track, DURATION_KEYS)),
        deck: first_str(track, DECK_KEYS),
        bpm: coerce_float(first_value(track, BPM_KEYS)),
        key: first_str(track, KEY_KEYS),
        source_path: first_str(track, SOURCE_PATH_KEYS),
        source_track_id: first_value(track, TRACK_ID_KEYS).and_then(node_to_text),
        played_at: first_datetime(track, START_KEYS, tz),
        raw: Some(track.to_json()),
    }
}

/// First alias holding a non-blank string, trimmed.
pub fn first_str(map: &NodeMap, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(k).and_then(Node::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First alias present with a non-blank value.
pub fn first_value<'a>(map: &'a NodeMap, keys: &[&str]) -> Option<&'a Node> {
    keys.iter()
        .filter_map(|k| map.get(k))
        .find(|v| !v.is_blank())
}

fn first_datetime(map: &NodeMap, keys: &[&str], tz: Tz) -> Option<DateTime<FixedOffset>> {
    keys.iter()
        .filter_map(|k| map.get(k))
        .find_map(|v| coerce_timestamp(v, tz))
}

fn earliest_datetime(map: &NodeMap, keys: &[&str], tz: Tz) -> Option<DateTime<FixedOffset>> {
    keys.iter()
        .filter_map(|k| map.get(k))
        .filter_map(|v| coerce_timestamp(v, tz))
        .min()
}
