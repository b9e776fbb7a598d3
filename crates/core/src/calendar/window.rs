//! Calendar-day windows in a named time zone.
//!
//! "Today" means local midnight to the next local midnight in the user's
//! zone, which is not always 24 hours long.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// One calendar day, as RFC3339 bounds in the zone it was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Parse an IANA zone name such as "America/New_York".
pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| format!("Unknown time zone: {name}"))
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<FixedOffset> {
    let naive = date.and_time(NaiveTime::MIN);
    // Midnight skipped by a DST jump: the day starts at the first valid local time.
    (0..=2)
        .find_map(|h| tz.from_local_datetime(&(naive + Duration::hours(h))).earliest())
        .map(|dt| dt.fixed_offset())
        .unwrap_or_else(|| naive.and_utc().fixed_offset())
}

/// `[00:00, next 00:00)` of `date` in `tz`.
pub fn day_window(date: NaiveDate, tz: Tz) -> DayWindow {
    let next = date.succ_opt().unwrap_or(date);
    DayWindow {
        date,
        start: local_midnight(date, tz),
        end: local_midnight(next, tz),
    }
}

/// The window of the day containing `now` in `tz`.
pub fn today(now: DateTime<Utc>, tz: Tz) -> DayWindow {
    day_window(now.with_timezone(&tz).date_naive(), tz)
}
