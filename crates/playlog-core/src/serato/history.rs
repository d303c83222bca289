//! `History/*.crate` session files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

use super::{UNKNOWN_TRACK, anchor_hint, list_files, session_label};
use crate::chunk::decode_chunks;
use crate::coerce::{decode_text, float_to_count, parse_with_formats};
use crate::config::ExtractConfig;
use crate::error::{ExtractError, FileFailure};
use crate::event::TrackPayload;
use crate::session::{Extraction, SessionMeta, SessionRecord, assemble};
use crate::timeline::{estimate_timeline, needs_estimate};
use crate::types::{PlayApp, TimelineMode, sanitize_path_component};

const TRACK_TAG: &str = "otrk";

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Read every `.crate` file in a `History` directory.
pub fn extract_dir(dir: &Path, config: &ExtractConfig) -> Extraction {
    let mut extraction = Extraction::default();
    for path in list_files(dir, &["crate"]) {
        match load_session(&path, config) {
            Ok(Some(record)) => extraction.sessions.push(record),
            Ok(None) => tracing::debug!(path = ?path, "crate has no tracks"),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "skipping serato crate");
                extraction.failures.push(FileFailure { path, error: e });
            }
        }
    }
    extraction
}

/// Parse one container file. `None` when it holds no tracks.
pub fn load_session(
    path: &Path,
    config: &ExtractConfig,
) -> Result<Option<SessionRecord>, ExtractError> {
    let data = fs::read(path).map_err(|e| ExtractError::io(path, e))?;
    let mut tracks = parse_tracks(&data, config.timezone);
    if tracks.is_empty() {
        return Ok(None);
    }

    let hint = anchor_hint(path, config.timezone);
    let mut timeline_mode = TimelineMode::Actual;
    if config.timeline_estimate && needs_estimate(&tracks) {
        estimate_timeline(&mut tracks, hint);
        timeline_mode = TimelineMode::Estimated;
    }
    let anchor = tracks.iter().filter_map(|t| t.played_at).min().unwrap_or(hint);

    let label = session_label(path);
    let meta = SessionMeta {
        app: PlayApp::Serato,
        session_id: sanitize_path_component(&label),
        label: Some(label),
        app_version: None,
        anchor,
        start: None,
        end: None,
        timeline_mode,
    };

    assemble(meta, tracks, config)
        .map(Some)
        .map_err(|source| ExtractError::Validation {
            path: path.to_path_buf(),
            source,
        })
}

/// Decode every `otrk` record in a container buffer.
pub fn parse_tracks(data: &[u8], tz: Tz) -> Vec<TrackPayload> {
    decode_chunks(data)
        .into_iter()
        .filter(|chunk| chunk.tag_str() == TRACK_TAG)
        .map(|chunk| track_from_fields(chunk.payload, tz))
        .collect()
}

fn track_from_fields(payload: &[u8], tz: Tz) -> TrackPayload {
    let fields: BTreeMap<String, &[u8]> = decode_chunks(payload)
        .into_iter()
        .map(|c| (c.tag_str(), c.payload))
        .collect();

    let text = |tags: &[&str]| -> Option<String> {
        tags.iter()
            .filter_map(|tag| fields.get(*tag))
            .map(|bytes| decode_text(bytes).trim().to_string())
            .find(|s| !s.is_empty())
    };

    let raw: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(tag, bytes)| (tag.clone(), serde_json::Value::String(decode_text(bytes))))
        .collect();

    TrackPayload {
        title: text(&["ttxt"]).unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
        artist: text(&["aART"]).unwrap_or_default(),
        album: text(&["albm"]).unwrap_or_default(),
        duration_sec: fields.get("dura").map_or(0, |b| decode_int(b)),
        deck: text(&["deck"]),
        bpm: fields.get("bpmf").and_then(|b| decode_float(b)),
        key: text(&["tkey", "key"]),
        source_path: text(&["path", "pfil"]),
        source_track_id: text(&["pidx"]),
        played_at: fields.get("pdat").and_then(|b| decode_datetime(b, tz)),
        raw: (!raw.is_empty()).then_some(serde_json::Value::Object(raw)),
    }
}

/// Decimal text, then float text, then a 2- or 4-byte big-endian integer.
pub fn decode_int(bytes: &[u8]) -> u32 {
    if bytes.is_empty() {
        return 0;
    }
    let text = decode_text(bytes);
    let text = text.trim();
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().unwrap_or(u32::MAX);
    }
    if let Ok(value) = text.parse::<f64>() {
        return float_to_count(value.trunc());
    }
    match *bytes {
        [a, b] => u32::from(u16::from_be_bytes([a, b])),
        [a, b, c, d] => u32::from_be_bytes([a, b, c, d]),
        _ => 0,
    }
}

/// Non-negative finite float text, else `None`.
pub fn decode_float(bytes: &[u8]) -> Option<f64> {
    let value = decode_text(bytes).trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Offset ISO form (with `Z` as UTC), then naive forms localized to `tz`.
pub fn decode_datetime(bytes: &[u8], tz: Tz) -> Option<DateTime<FixedOffset>> {
    let text = decode_text(bytes);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let offset_form = text
        .strip_suffix('Z')
        .map_or_else(|| text.to_string(), |base| format!("{base}+0000"));
    DateTime::parse_from_str(&offset_form, "%Y-%m-%dT%H:%M:%S%z")
        .ok()
        .or_else(|| parse_with_formats(text, NAIVE_FORMATS, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::encode_chunks;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn track(fields: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let inner = encode_chunks(fields.iter().map(|(tag, payload)| (**tag, *payload))).unwrap();
        encode_chunks([(*b"otrk", inner.as_slice())]).unwrap()
    }

    fn write_crate(dir: &Path, name: &str, tracks: &[Vec<u8>]) -> std::path::PathBuf {
        let mut data = encode_chunks([(*b"vrsn", &b"1.0/Serato ScratchLive Crate"[..])]).unwrap();
        for t in tracks {
            data.extend_from_slice(t);
        }
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn decodes_known_fields() {
        let data = track(&[
            (b"ttxt", b"Loft Intro"),
            (b"aART", b"DJ Alpha"),
            (b"albm", b"Warmups"),
            (b"dura", b"245"),
            (b"bpmf", b"122.5"),
            (b"tkey", b"8A"),
            (b"pfil", b"/music/loft.mp3"),
            (b"pidx", b"42"),
            (b"deck", b"1"),
            (b"pdat", b"2025-11-12T23:00:00Z"),
            (b"zzzz", b"mystery"),
        ]);
        let tracks = parse_tracks(&data, Tz::UTC);

        assert_eq!(tracks.len(), 1);
        let t = &tracks[0];
        assert_eq!(t.title, "Loft Intro");
        assert_eq!(t.artist, "DJ Alpha");
        assert_eq!(t.album, "Warmups");
        assert_eq!(t.duration_sec, 245);
        assert_eq!(t.bpm, Some(122.5));
        assert_eq!(t.key.as_deref(), Some("8A"));
        assert_eq!(t.source_path.as_deref(), Some("/music/loft.mp3"));
        assert_eq!(t.source_track_id.as_deref(), Some("42"));
        assert_eq!(t.deck.as_deref(), Some("1"));
        assert_eq!(
            t.played_at.unwrap().to_rfc3339(),
            "2025-11-12T23:00:00+00:00"
        );
        assert_eq!(t.raw.as_ref().unwrap()["zzzz"], "mystery");
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let tracks = parse_tracks(&track(&[(b"aART", b"Someone")]), Tz::UTC);
        assert_eq!(tracks[0].title, UNKNOWN_TRACK);
        assert_eq!(tracks[0].duration_sec, 0);
        assert!(tracks[0].played_at.is_none());
    }

    #[test]
    fn utf16_title_is_decoded() {
        let title: Vec<u8> = "Über".encode_utf16().flat_map(u16::to_be_bytes).collect();
        let tracks = parse_tracks(&track(&[(b"ttxt", &title)]), Tz::UTC);
        assert_eq!(tracks[0].title, "Über");
    }

    #[test]
    fn decode_int_forms() {
        assert_eq!(decode_int(b"300"), 300);
        assert_eq!(decode_int(b"245.9"), 245);
        assert_eq!(decode_int(&[0x01, 0x2c]), 300);
        assert_eq!(decode_int(&[0x00, 0x00, 0x00, 0xf0]), 240);
        assert_eq!(decode_int(b"abc"), 0);
        assert_eq!(decode_int(b""), 0);
    }

    #[test]
    fn decode_float_forms() {
        assert_eq!(decode_float(b" 128.00 "), Some(128.0));
        assert_eq!(decode_float(b"fast"), None);
    }

    #[test]
    fn decode_float_rejects_negative_and_non_finite() {
        for text in ["-120", "NaN", "inf", "-inf"] {
            assert_eq!(decode_float(text.as_bytes()), None, "{text}");
        }
        assert_eq!(decode_float(b"0"), Some(0.0));

        let tracks = parse_tracks(&track(&[(b"ttxt", b"T"), (b"bpmf", b"NaN")]), Tz::UTC);
        assert_eq!(tracks[0].bpm, None);
    }

    #[test]
    fn decode_datetime_forms() {
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        assert_eq!(
            decode_datetime(b"2025-11-12T23:00:00+0900", Tz::UTC)
                .unwrap()
                .to_rfc3339(),
            "2025-11-12T23:00:00+09:00"
        );
        assert_eq!(
            decode_datetime(b"2025/11/12 23:00:00", tokyo)
                .unwrap()
                .to_rfc3339(),
            "2025-11-12T23:00:00+09:00"
        );
        assert!(decode_datetime(b"yesterday", Tz::UTC).is_none());
    }

    #[test]
    fn load_session_builds_actual_timeline() {
        let temp = TempDir::new().unwrap();
        let path = write_crate(
            temp.path(),
            "2025-11-12_Main.crate",
            &[
                track(&[(b"ttxt", b"One"), (b"pdat", b"2025-11-12 23:30:00")]),
                track(&[(b"ttxt", b"Two"), (b"pdat", b"2025-11-13 00:10:00")]),
            ],
        );

        let record = load_session(&path, &ExtractConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.session.session_id, "2025-11-12 Main");
        assert_eq!(record.session.timeline_mode, TimelineMode::Actual);
        assert_eq!(
            record.session.night_date,
            NaiveDate::from_ymd_opt(2025, 11, 12).unwrap()
        );
        assert_eq!(
            record.events[1].session_date,
            NaiveDate::from_ymd_opt(2025, 11, 13).unwrap()
        );
    }

    #[test]
    fn untimed_crate_is_estimated_when_enabled() {
        let temp = TempDir::new().unwrap();
        let tracks = [
            track(&[(b"ttxt", b"One"), (b"dura", b"180")]),
            track(&[(b"ttxt", b"Two")]),
        ];
        let path = write_crate(temp.path(), "Night_2025-05-05.crate", &tracks);

        let config = ExtractConfig {
            timeline_estimate: true,
            ..ExtractConfig::default()
        };
        let record = load_session(&path, &config).unwrap().unwrap();
        assert_eq!(record.session.timeline_mode, TimelineMode::Estimated);
        let times: Vec<_> = record
            .events
            .iter()
            .map(|e| e.played_at.unwrap().to_rfc3339())
            .collect();
        assert_eq!(
            times,
            vec!["2025-05-05T22:00:00+00:00", "2025-05-05T22:03:00+00:00"]
        );

        let record = load_session(&path, &ExtractConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.session.timeline_mode, TimelineMode::Actual);
        assert!(record.events.iter().all(|e| e.played_at.is_none()));
        assert_eq!(
            record.session.night_date,
            NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()
        );
    }

    #[test]
    fn reserved_characters_are_sanitized_in_session_id() {
        let temp = TempDir::new().unwrap();
        let path = write_crate(temp.path(), "a?b*c.crate", &[track(&[(b"ttxt", b"x")])]);
        let record = load_session(&path, &ExtractConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.session.session_id, "a_b_c");
        assert_eq!(record.session.session_label.as_deref(), Some("a?b*c"));
    }

    #[test]
    fn empty_crate_yields_no_session() {
        let temp = TempDir::new().unwrap();
        let path = write_crate(temp.path(), "empty.crate", &[]);
        assert!(load_session(&path, &ExtractConfig::default()).unwrap().is_none());

        let extraction = extract_dir(temp.path(), &ExtractConfig::default());
        assert!(extraction.sessions.is_empty());
        assert!(extraction.failures.is_empty());
    }
}
