//! `Logs/*.log` and `Logs/*.txt` play logs.
//!
//! Lines look like `23:58:00 Deck A Artist - Title`. Only the time of day
//! is recorded, so the date is carried forward from the session start and
//! bumped whenever the clock steps backwards.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use encoding_rs::{Encoding, WINDOWS_1252};
use regex::Regex;

use super::{UNKNOWN_TRACK, anchor_hint, list_files, session_label};
use crate::coerce::{decode_text, localize, parse_with_formats};
use crate::config::ExtractConfig;
use crate::error::{ExtractError, FileFailure};
use crate::event::TrackPayload;
use crate::session::{Extraction, SessionMeta, SessionRecord, assemble};
use crate::types::{PlayApp, TimelineMode, sanitize_path_component};

static LOG_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<time>\d{2}:\d{2}:\d{2})\s+(?P<deck>Deck\s+\w+|DECK\s+\w+)\s+(?P<body>.+)")
        .unwrap()
});

static SESSION_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Session Start @ (?P<dt>.+)").unwrap());

const SESSION_START_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// One matched play line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine<'a> {
    pub time: NaiveTime,
    pub deck: &'a str,
    pub body: &'a str,
}

/// Read every log in a `Logs` directory.
pub fn extract_dir(dir: &Path, config: &ExtractConfig) -> Extraction {
    let mut extraction = Extraction::default();
    for path in list_files(dir, &["log", "txt"]) {
        match load_session(&path, config) {
            Ok(Some(record)) => extraction.sessions.push(record),
            Ok(None) => tracing::debug!(path = ?path, "log has no play lines"),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "skipping serato log");
                extraction.failures.push(FileFailure { path, error: e });
            }
        }
    }
    extraction
}

/// Parse one log file. `None` when no line matched.
pub fn load_session(
    path: &Path,
    config: &ExtractConfig,
) -> Result<Option<SessionRecord>, ExtractError> {
    let bytes = fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    let content = decode_log_text(&bytes);
    let tz = config.timezone;

    let base = session_start(&content, tz).unwrap_or_else(|| anchor_hint(path, tz));
    let tracks = parse_lines(&content, base.date_naive(), tz);
    let Some(anchor) = tracks.first().and_then(|t| t.played_at) else {
        return Ok(None);
    };

    let label = session_label(path);
    let meta = SessionMeta {
        app: PlayApp::Serato,
        session_id: sanitize_path_component(&label),
        label: Some(label),
        app_version: None,
        anchor,
        start: None,
        end: None,
        timeline_mode: TimelineMode::Actual,
    };

    assemble(meta, tracks, config)
        .map(Some)
        .map_err(|source| ExtractError::Validation {
            path: path.to_path_buf(),
            source,
        })
}

/// Log text is UTF-8 or a single-byte codepage. UTF-16 is only taken when
/// the bytes carry a BOM or NULs.
pub fn decode_log_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.trim_matches('\0').to_string();
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.trim_matches('\0').to_string();
    }
    if bytes.contains(&0) {
        return decode_text(bytes);
    }
    WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
}

/// The first parseable `Session Start @ ...` marker.
pub fn session_start(content: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    content.lines().find_map(|line| {
        let caps = SESSION_START_RE.captures(line.trim())?;
        parse_with_formats(caps["dt"].trim(), SESSION_START_FORMATS, tz)
    })
}

pub fn match_line(line: &str) -> Option<LogLine<'_>> {
    let caps = LOG_LINE_RE.captures(line)?;
    let time = NaiveTime::parse_from_str(caps.name("time")?.as_str(), "%H:%M:%S").ok()?;
    Some(LogLine {
        time,
        deck: caps.name("deck")?.as_str().trim(),
        body: caps.name("body")?.as_str().trim(),
    })
}

/// Turn matched lines into timed tracks starting on `base_date`.
///
/// Any time earlier than the previous line is taken as a midnight crossing.
pub fn parse_lines(content: &str, base_date: NaiveDate, tz: Tz) -> Vec<TrackPayload> {
    let mut current_date = base_date;
    let mut previous: Option<DateTime<FixedOffset>> = None;
    let mut tracks = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        let Some(matched) = match_line(line) else {
            if !line.is_empty() {
                tracing::trace!(line, "unmatched log line");
            }
            continue;
        };

        let mut played = localize(current_date.and_time(matched.time), tz);
        if previous.is_some_and(|prev| played < prev) {
            current_date = current_date
                .checked_add_days(Days::new(1))
                .unwrap_or(current_date);
            played = localize(current_date.and_time(matched.time), tz);
        }
        previous = Some(played);

        let (artist, title) = split_artist_title(matched.body);
        tracks.push(TrackPayload {
            title,
            artist,
            deck: Some(matched.deck.to_string()),
            played_at: Some(played),
            raw: Some(serde_json::json!({ "line": line })),
            ..TrackPayload::default()
        });
    }
    tracks
}

/// Split `Artist - Title` on the first separator.
pub fn split_artist_title(body: &str) -> (String, String) {
    let (artist, title) = body.split_once(" - ").unwrap_or(("", body));
    let title = title.trim();
    let title = if title.is_empty() { UNKNOWN_TRACK } else { title };
    (artist.trim().to_string(), title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn matches_deck_lines() {
        let line = match_line("23:58:00 Deck A Artist A - Set Song").unwrap();
        assert_eq!(line.time, NaiveTime::from_hms_opt(23, 58, 0).unwrap());
        assert_eq!(line.deck, "Deck A");
        assert_eq!(line.body, "Artist A - Set Song");

        assert!(match_line("DECK 2   Loaded track").is_none());
        assert!(match_line("25:00:00 Deck A Bad time").is_none());
        assert!(match_line("12:00:00 DECK 2 Upper").is_some());
    }

    #[test]
    fn rollover_advances_the_date() {
        let content = "23:58:00 Deck A Artist - Late\n00:05:00 Deck B Artist - Early\n";
        let tracks = parse_lines(content, date(2025, 11, 12), Tz::UTC);

        let first = tracks[0].played_at.unwrap();
        let second = tracks[1].played_at.unwrap();
        assert_eq!(first.date_naive(), date(2025, 11, 12));
        assert_eq!(second.date_naive(), date(2025, 11, 13));
        assert!(second > first);
    }

    #[test]
    fn every_backwards_step_is_a_new_day() {
        let content = "22:00:00 Deck A a - 1\n21:00:00 Deck A b - 2\n20:00:00 Deck A c - 3\n";
        let tracks = parse_lines(content, date(2025, 1, 1), Tz::UTC);
        let dates: Vec<_> = tracks
            .iter()
            .map(|t| t.played_at.unwrap().date_naive())
            .collect();
        assert_eq!(dates, vec![date(2025, 1, 1), date(2025, 1, 2), date(2025, 1, 3)]);
    }

    #[test]
    fn splits_artist_and_title() {
        assert_eq!(
            split_artist_title("Artist - Title - Remix"),
            ("Artist".to_string(), "Title - Remix".to_string())
        );
        assert_eq!(
            split_artist_title("Just A Title"),
            (String::new(), "Just A Title".to_string())
        );
        assert_eq!(
            split_artist_title("Artist - "),
            ("Artist".to_string(), UNKNOWN_TRACK.to_string())
        );
    }

    #[test]
    fn session_start_marker_sets_base_date() {
        let content = "Serato DJ Pro\nSession Start @ 2025/11/12 21:30:00\n";
        let start = session_start(content, Tz::UTC).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-11-12T21:30:00+00:00");
        assert!(session_start("no marker here", Tz::UTC).is_none());
    }

    #[test]
    fn load_session_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Friday Loft.log");
        fs::write(
            &path,
            "Session Start @ 2025-11-12 22:00:00\n\
             23:58:00 Deck A Artist A - Closing Intro\n\
             noise line\n\
             00:05:00 Deck B Artist B - After Midnight\n",
        )
        .unwrap();

        let record = load_session(&path, &ExtractConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.session.session_id, "Friday Loft");
        assert_eq!(record.session.night_date, date(2025, 11, 12));
        assert_eq!(record.events.len(), 2);
        assert_eq!(record.events[0].deck.as_deref(), Some("Deck A"));
        assert_eq!(record.events[1].title, "After Midnight");
        assert_eq!(record.events[1].session_date, date(2025, 11, 13));
        assert_eq!(record.events[1].night_date, date(2025, 11, 12));
        assert_eq!(
            record.events[0].raw.as_ref().unwrap()["line"],
            "23:58:00 Deck A Artist A - Closing Intro"
        );
        assert_eq!(
            record.session.session_end,
            record.events[1].played_at
        );
    }

    #[test]
    fn single_byte_log_is_not_read_as_utf16() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("2025-11-12.log");
        // Even length, invalid UTF-8: a UTF-16 decode would also succeed.
        let bytes = b"23:00:00 Deck A Beyonc\xE9 - Halo!\n";
        assert_eq!(bytes.len() % 2, 0);
        fs::write(&path, bytes).unwrap();

        let record = load_session(&path, &ExtractConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.events[0].artist, "Beyonc\u{e9}");
        assert_eq!(record.events[0].title, "Halo!");
    }

    #[test]
    fn bom_marked_utf16_log_still_decodes() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "23:00:00 Deck A A - B\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert!(decode_log_text(&bytes).contains("Deck A A - B"));
    }

    #[test]
    fn log_without_play_lines_has_no_session() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("2025-11-12.txt");
        fs::write(&path, "Session Start @ 2025-11-12 22:00:00\n").unwrap();
        assert!(load_session(&path, &ExtractConfig::default()).unwrap().is_none());
    }

    #[test]
    fn base_date_falls_back_to_file_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("set_2025-06-01.txt");
        fs::write(&path, "23:10:00 Deck 1 Someone - Something\n").unwrap();
        let record = load_session(&path, &ExtractConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            record.events[0].played_at.unwrap().to_rfc3339(),
            "2025-06-01T23:10:00+00:00"
        );
    }
}
