//! Session file renderers.
//!
//! Every session lands in `<out>/<app>/<night_date>/<session id>/` as
//! `session.json`, `session.txt` and/or `session.csv`.

use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use playlog_core::{ExtractConfig, NightSession, SessionRecord, sanitize_path_component};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Txt,
    Csv,
}

#[derive(Debug, Error)]
#[error("unknown output format: {0} (expected json, txt or csv)")]
pub struct UnknownFormat(String);

impl Format {
    pub const ALL: [Self; 3] = [Self::Json, Self::Txt, Self::Csv];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Txt => "txt",
            Self::Csv => "csv",
        }
    }

    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Json => "session.json",
            Self::Txt => "session.txt",
            Self::Csv => "session.csv",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "txt" => Ok(Self::Txt),
            "csv" => Ok(Self::Csv),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Directory a session's files are written to.
pub fn session_dir(out_dir: &Path, session: &NightSession) -> PathBuf {
    out_dir
        .join(session.app.as_str())
        .join(session.night_date.to_string())
        .join(sanitize_path_component(session.session_id.as_str()))
}

/// Write the requested formats for one session, returning the written paths.
///
/// Formats are written in `json, txt, csv` order regardless of request order.
pub fn render_session(
    record: &SessionRecord,
    out_dir: &Path,
    config: &ExtractConfig,
    formats: &[Format],
) -> Result<Vec<PathBuf>> {
    let dir = session_dir(out_dir, &record.session);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut written = Vec::new();
    for format in Format::ALL.into_iter().filter(|f| formats.contains(f)) {
        let path = dir.join(format.file_name());
        match format {
            Format::Json => {
                let json = serde_json::to_string_pretty(record)?;
                fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            Format::Txt => {
                fs::write(&path, render_txt(record, config))
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            Format::Csv => {
                let file = fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                write_csv(file, record, config.timezone)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        }
        written.push(path);
    }
    Ok(written)
}

/// Human-readable session summary.
pub fn render_txt(record: &SessionRecord, config: &ExtractConfig) -> String {
    let session = &record.session;
    let tz = config.timezone;
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "[PlayLog]");
    let _ = writeln!(
        out,
        "App: {} ({})",
        session.app,
        session.app_version.as_deref().unwrap_or("n/a")
    );
    let _ = writeln!(
        out,
        "NightDate: {}  (cutoff={}, tz={})",
        session.night_date,
        config.cutoff.format("%H:%M"),
        tz.name()
    );
    let _ = writeln!(out, "Session: {}", session.session_id);
    let _ = writeln!(out, "Start: {}", format_instant(session.session_start, tz));
    let _ = writeln!(out, "End: {}", format_instant(session.session_end, tz));
    let _ = writeln!(out, "Tracks: {}", record.events.len());
    let _ = writeln!(out, "Timeline: {}", session.timeline_mode);
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Tracks ---");

    for (idx, event) in record.events.iter().enumerate() {
        let artist = if event.artist.is_empty() {
            "Unknown Artist"
        } else {
            &event.artist
        };
        let album = if event.album.is_empty() {
            "n/a"
        } else {
            &event.album
        };
        let bpm = event.bpm.map_or_else(|| "n/a".to_string(), |b| b.to_string());
        let _ = writeln!(
            out,
            "{}. [{}] {} - {}  (Album: {}, BPM: {}, Key: {}, DurationSec: {})",
            idx + 1,
            format_instant(event.played_at, tz),
            artist,
            event.title,
            album,
            bpm,
            event.key.as_deref().unwrap_or("n/a"),
            event.duration_sec
        );
    }
    out
}

const CSV_HEADER: [&str; 11] = [
    "index",
    "played_at",
    "title",
    "artist",
    "album",
    "duration_sec",
    "deck",
    "bpm",
    "key",
    "source_path",
    "source_track_id",
];

/// One CSV row per event.
pub fn write_csv<W: io::Write>(writer: W, record: &SessionRecord, tz: Tz) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for (idx, event) in record.events.iter().enumerate() {
        let played_at = event
            .played_at
            .map(|at| format_instant(Some(at), tz))
            .unwrap_or_default();
        csv.write_record([
            (idx + 1).to_string(),
            played_at,
            event.title.to_string(),
            event.artist.clone(),
            event.album.clone(),
            event.duration_sec.to_string(),
            event.deck.clone().unwrap_or_default(),
            event.bpm.map(|b| b.to_string()).unwrap_or_default(),
            event.key.clone().unwrap_or_default(),
            event.source_path.clone().unwrap_or_default(),
            event.source_track_id.clone().unwrap_or_default(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Instant in `tz` with seconds precision, or `n/a`.
fn format_instant(value: Option<DateTime<FixedOffset>>, tz: Tz) -> String {
    value.map_or_else(
        || "n/a".to_string(),
        |at| at.with_timezone(&tz).format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use insta::assert_snapshot;
    use playlog_core::{PlayApp, PlayEvent, SessionId, TimelineMode, TrackTitle};

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 11, 12, h, m, 0)
            .unwrap()
            .fixed_offset()
    }

    fn event(title: &str, artist: &str, played_at: Option<DateTime<FixedOffset>>) -> PlayEvent {
        PlayEvent {
            app: PlayApp::Serato,
            app_version: None,
            session_id: SessionId::new("Main/Room").unwrap(),
            session_date: NaiveDate::from_ymd_opt(2025, 11, 12).unwrap(),
            night_date: NaiveDate::from_ymd_opt(2025, 11, 12).unwrap(),
            played_at,
            title: TrackTitle::new(title).unwrap(),
            artist: artist.to_string(),
            album: String::new(),
            duration_sec: 0,
            deck: None,
            bpm: None,
            key: None,
            source_path: None,
            source_track_id: None,
            raw: None,
        }
    }

    fn record() -> SessionRecord {
        let mut first = event("Opener", "Artist A", Some(at(23, 0)));
        first.album = "Warmups".to_string();
        first.bpm = Some(122.5);
        first.key = Some("8A".to_string());
        first.duration_sec = 245;
        first.deck = Some("1".to_string());
        let second = event("Closer, Part 2", "", None);

        SessionRecord {
            session: NightSession {
                app: PlayApp::Serato,
                session_id: SessionId::new("Main/Room").unwrap(),
                night_date: NaiveDate::from_ymd_opt(2025, 11, 12).unwrap(),
                session_label: Some("Main/Room".to_string()),
                app_version: None,
                session_start: Some(at(23, 0)),
                session_end: Some(at(23, 0)),
                timeline_mode: TimelineMode::Actual,
            },
            events: vec![first, second],
        }
    }

    fn tokyo() -> ExtractConfig {
        ExtractConfig::with_timezone("Asia/Tokyo").unwrap()
    }

    #[test]
    fn txt_output() {
        assert_snapshot!(render_txt(&record(), &tokyo()), @r"
        [PlayLog]
        App: serato (n/a)
        NightDate: 2025-11-12  (cutoff=08:00, tz=Asia/Tokyo)
        Session: Main/Room
        Start: 2025-11-13T08:00:00+09:00
        End: 2025-11-13T08:00:00+09:00
        Tracks: 2
        Timeline: actual

        --- Tracks ---
        1. [2025-11-13T08:00:00+09:00] Artist A - Opener  (Album: Warmups, BPM: 122.5, Key: 8A, DurationSec: 245)
        2. [n/a] Unknown Artist - Closer, Part 2  (Album: n/a, BPM: n/a, Key: n/a, DurationSec: 0)
        ");
    }

    #[test]
    fn csv_output() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &record(), Tz::UTC).unwrap();
        assert_snapshot!(String::from_utf8(buf).unwrap(), @r#"
        index,played_at,title,artist,album,duration_sec,deck,bpm,key,source_path,source_track_id
        1,2025-11-12T23:00:00+00:00,Opener,Artist A,Warmups,245,1,122.5,8A,,
        2,,"Closer, Part 2",,,0,,,,,
        "#);
    }

    #[test]
    fn render_session_writes_requested_files() {
        let temp = tempfile::tempdir().unwrap();
        let written = render_session(
            &record(),
            temp.path(),
            &ExtractConfig::default(),
            &[Format::Csv, Format::Json],
        )
        .unwrap();

        let dir = temp.path().join("serato").join("2025-11-12").join("Main_Room");
        assert_eq!(
            written,
            vec![dir.join("session.json"), dir.join("session.csv")]
        );

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("session.json")).unwrap()).unwrap();
        assert_eq!(json["session"]["session_id"], "Main/Room");
        assert_eq!(json["session"]["night_date"], "2025-11-12");
        assert_eq!(json["events"].as_array().unwrap().len(), 2);
        assert!(!dir.join("session.txt").exists());
    }

    #[test]
    fn format_parsing() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert!("pdf".parse::<Format>().is_err());
    }
}
