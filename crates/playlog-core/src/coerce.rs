//! Text and datetime coercion shared by every extractor.
//!
//! Nothing in here fails: undecodable or unparseable input resolves to an
//! empty string, zero, or `None`.

use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use regex::Regex;

use crate::document::Node;

/// ISO-8601 forms carrying an explicit offset (`Z` is rewritten to `+00:00`).
const ISO_OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
];

/// ISO-8601 forms without an offset; localized to the configured timezone.
const ISO_NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Fallback patterns tried after ISO-8601.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

static DATE_DELIMITED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(20\d{2})[-_](0[1-9]|1[0-2])[-_](0[1-9]|[12]\d|3[01])").unwrap()
});

static DATE_COMPACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(20\d{2})(0[1-9]|1[0-2])(0[1-9]|[12]\d|3[01])").unwrap());

/// Decode bytes as UTF-8, UTF-16BE, UTF-16LE, then Latin-1.
///
/// The first encoding that decodes cleanly wins. NUL padding is stripped.
pub fn decode_text(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    let text = std::str::from_utf8(bytes)
        .map(str::to_owned)
        .ok()
        .or_else(|| decode_strict(UTF_16BE, bytes))
        .or_else(|| decode_strict(UTF_16LE, bytes))
        .unwrap_or_else(|| bytes.iter().copied().map(char::from).collect());

    text.trim_matches('\0').to_string()
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(std::borrow::Cow::into_owned)
}

/// Attach `tz` to a wall-clock time.
///
/// Ambiguous times take the earlier offset; times skipped by a DST jump take
/// the offset in effect at that instant read as UTC.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> DateTime<FixedOffset> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.fixed_offset(),
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&naive).fix();
            let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
            DateTime::from_naive_utc_and_offset(utc, offset)
        }
    }
}

/// Calendar date of an instant in `tz`.
pub fn local_date(instant: &DateTime<FixedOffset>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Coerce a document value into a timezone-aware instant.
pub fn coerce_timestamp(value: &Node, tz: Tz) -> Option<DateTime<FixedOffset>> {
    match value {
        Node::Date(dt) => Some(dt.with_timezone(&tz).fixed_offset()),
        Node::Integer(secs) => from_epoch(*secs, 0, tz),
        Node::Real(secs) if secs.is_finite() => {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "epoch seconds fit in i64 for any plausible history file"
            )]
            let whole = secs.floor() as i64;
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "fractional part is in [0, 1)"
            )]
            let nanos = ((secs - secs.floor()) * 1e9) as u32;
            from_epoch(whole, nanos, tz)
        }
        Node::String(s) => parse_timestamp(s, tz),
        _ => None,
    }
}

fn from_epoch(secs: i64, nanos: u32, tz: Tz) -> Option<DateTime<FixedOffset>> {
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|dt| dt.with_timezone(&tz).fixed_offset())
}

/// Parse a timestamp string: ISO-8601 first, then the fallback patterns.
pub fn parse_timestamp(text: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(dt) = parse_iso8601(text, tz) {
        return Some(dt);
    }

    parse_with_formats(text, DATETIME_FORMATS, tz)
}

fn parse_iso8601(text: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let normalized = text
        .strip_suffix('Z')
        .map_or_else(|| text.to_string(), |rest| format!("{rest}+00:00"));

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt);
    }
    for fmt in ISO_OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt);
        }
    }
    if let Some(dt) = parse_with_formats(text, ISO_NAIVE_FORMATS, tz) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| localize(date.and_time(NaiveTime::MIN), tz))
}

/// Try naive patterns in order and localize the first match.
pub fn parse_with_formats(text: &str, formats: &[&str], tz: Tz) -> Option<DateTime<FixedOffset>> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| localize(naive, tz))
}

/// Coerce a numeric-like value to a non-negative integer. Failure yields 0.
pub fn coerce_int(value: Option<&Node>) -> u32 {
    match value {
        Some(Node::Boolean(b)) => u32::from(*b),
        Some(Node::Integer(i)) => u32::try_from((*i).max(0)).unwrap_or(u32::MAX),
        Some(Node::Real(r)) => float_to_count(r.round()),
        Some(Node::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_or(0, |f| float_to_count(f.trunc())),
        _ => 0,
    }
}

/// Coerce a numeric-like value to a non-negative float.
pub fn coerce_float(value: Option<&Node>) -> Option<f64> {
    let number = match value? {
        Node::Boolean(b) => f64::from(u8::from(*b)),
        #[expect(clippy::cast_precision_loss, reason = "BPM-scale integers")]
        Node::Integer(i) => *i as f64,
        Node::Real(r) => *r,
        Node::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (number.is_finite() && number >= 0.0).then_some(number)
}

/// Clamp a float into the `u32` range, NaN and negatives become 0.
pub(crate) fn float_to_count(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "range checked above"
        )]
        let count = value as u32;
        count
    }
}

/// Render a scalar as text (used for track identifiers).
pub fn node_to_text(value: &Node) -> Option<String> {
    match value {
        Node::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Node::Integer(i) => Some(i.to_string()),
        Node::Real(r) => Some(r.to_string()),
        Node::Boolean(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Node::Date(d) => Some(d.to_rfc3339()),
        Node::Data(_) | Node::Map(_) | Node::List(_) => None,
    }
}

/// A date embedded in a file name, anchored at `hour` local time.
///
/// Delimited forms (`2025-05-01`, `2025_05_01`) are tried first; the compact
/// `20250501` form only when `allow_compact` is set.
pub fn date_hint(name: &str, hour: u32, allow_compact: bool, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let caps = DATE_DELIMITED_RE.captures(name).or_else(|| {
        if allow_compact {
            DATE_COMPACT_RE.captures(name)
        } else {
            None
        }
    })?;

    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
    Some(localize(date.and_time(time), tz))
}

/// Last-modified time of a file, if the filesystem reports one.
pub fn modified_time(path: &Path, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let modified: SystemTime = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let utc: DateTime<Utc> = modified.into();
    Some(utc.with_timezone(&tz).fixed_offset())
}

/// Base name without extension, or an empty string.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
