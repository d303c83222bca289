//! Night bucketing: which calendar night an instant belongs to.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use chrono_tz::Tz;

use crate::coerce::localize;

/// The night an instant belongs to.
///
/// Instants before `cutoff` (local to `tz`) count toward the previous day, so
/// a set starting at 01:00 is filed under the night it started the evening
/// before.
pub fn night_date(instant: &DateTime<FixedOffset>, cutoff: NaiveTime, tz: Tz) -> NaiveDate {
    let local = instant.with_timezone(&tz);
    let day = local.date_naive();
    let cutoff_at = localize(day.and_time(cutoff), tz);

    if local.fixed_offset() < cutoff_at {
        day.pred_opt().unwrap_or(day)
    } else {
        day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::config::DEFAULT_CUTOFF;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 11, 13, h, m, 0)
            .unwrap()
            .fixed_offset()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn before_cutoff_is_previous_night() {
        assert_eq!(
            night_date(&at(7, 30), DEFAULT_CUTOFF, Tz::UTC),
            date(2025, 11, 12)
        );
    }

    #[test]
    fn at_cutoff_is_same_day() {
        assert_eq!(
            night_date(&at(8, 0), DEFAULT_CUTOFF, Tz::UTC),
            date(2025, 11, 13)
        );
    }

    #[test]
    fn one_minute_apart_agree_unless_straddling() {
        for (h, m) in [(0, 0), (1, 15), (6, 58), (8, 1), (12, 0), (23, 58)] {
            let t = at(h, m);
            assert_eq!(
                night_date(&t, DEFAULT_CUTOFF, Tz::UTC),
                night_date(&(t + Duration::minutes(1)), DEFAULT_CUTOFF, Tz::UTC),
                "{h:02}:{m:02}"
            );
        }
        let t = at(7, 59);
        assert_ne!(
            night_date(&t, DEFAULT_CUTOFF, Tz::UTC),
            night_date(&(t + Duration::minutes(1)), DEFAULT_CUTOFF, Tz::UTC)
        );
    }

    #[test]
    fn cutoff_is_evaluated_in_configured_timezone() {
        // 22:30 UTC is 07:30 next morning in Tokyo.
        let t = Utc
            .with_ymd_and_hms(2025, 11, 12, 22, 30, 0)
            .unwrap()
            .fixed_offset();
        assert_eq!(night_date(&t, DEFAULT_CUTOFF, Tz::Asia__Tokyo), date(2025, 11, 12));
        assert_eq!(night_date(&t, DEFAULT_CUTOFF, Tz::UTC), date(2025, 11, 12));

        let t = Utc
            .with_ymd_and_hms(2025, 11, 12, 23, 30, 0)
            .unwrap()
            .fixed_offset();
        assert_eq!(night_date(&t, DEFAULT_CUTOFF, Tz::Asia__Tokyo), date(2025, 11, 13));
    }
}
