//! Shared scheduling helpers for the calendar tools: time parsing in the
//! user's zone and the conflict check run before every write.

use calmate_core::calendar::{
    CalendarBackend, CalendarEvent, EventQuery, TimeSpan, find_conflicts, parse_timezone,
    search_window,
};
use calmate_core::error::ToolError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::debug;

/// Colour used when the model does not pick one ("other").
pub const DEFAULT_COLOR_ID: &str = "7";

/// Upper bound on events fetched for one conflict check.
const CONFLICT_SCAN_LIMIT: u32 = 50;

/// Settings shared by the calendar tools.
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub default_timezone: Tz,
    pub conflict_buffer: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            default_timezone: chrono_tz::America::New_York,
            conflict_buffer: Duration::minutes(calmate_core::calendar::DEFAULT_BUFFER_MINUTES),
        }
    }
}

impl ScheduleSettings {
    /// Settings for a named default zone and a buffer in minutes.
    pub fn new(timezone: &str, buffer_minutes: i64) -> Result<Self, String> {
        Ok(Self {
            default_timezone: parse_timezone(timezone)?,
            conflict_buffer: Duration::minutes(buffer_minutes),
        })
    }

    /// The zone named by a tool argument, or the default.
    pub fn zone(&self, name: Option<&str>) -> Result<Tz, ToolError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => parse_timezone(name).map_err(ToolError::InvalidArguments),
            None => Ok(self.default_timezone),
        }
    }
}

/// Parse a time argument.
///
/// RFC3339 strings keep their offset. Offset-less forms
/// (`2026-10-19T14:00`, `2026-10-19 14:00:00`, `2026-10-19`) are read as
/// wall-clock time in `tz`.
pub fn parse_time(field: &str, value: &str, tz: Tz) -> Result<DateTime<FixedOffset>, ToolError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt);
    }

    let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .ok_or_else(|| {
            ToolError::InvalidArguments(format!(
                "'{field}' must be an RFC3339 timestamp such as 2026-10-19T14:00:00-04:00, got '{value}'"
            ))
        })?;

    localize(field, naive, tz)
}

/// The same wall-clock time, read in another zone.
pub fn wall_clock_in(field: &str, dt: DateTime<FixedOffset>, tz: Tz) -> Result<DateTime<FixedOffset>, ToolError> {
    localize(field, dt.naive_local(), tz)
}

fn localize(field: &str, naive: NaiveDateTime, tz: Tz) -> Result<DateTime<FixedOffset>, ToolError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| {
            ToolError::InvalidArguments(format!(
                "'{field}' ({naive}) does not exist in {tz}, it falls in a daylight-saving gap"
            ))
        })
}

/// A `[start, end)` span, rejecting empty or inverted ranges.
pub fn span_of(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<TimeSpan, ToolError> {
    TimeSpan::new(start.with_timezone(&chrono::Utc), end.with_timezone(&chrono::Utc))
        .ok_or_else(|| ToolError::InvalidArguments("'end' must be after 'start'".into()))
}

/// Colour ids accepted by Google Calendar.
pub fn check_color(color_id: &str) -> Result<(), ToolError> {
    match color_id.parse::<u8>() {
        Ok(1..=11) => Ok(()),
        _ => Err(ToolError::InvalidArguments(format!(
            "'color_id' must be a string from \"1\" to \"11\", got '{color_id}'"
        ))),
    }
}

/// Existing events too close to `proposed`.
pub async fn conflicts_for(
    calendar: &Arc<dyn CalendarBackend>,
    settings: &ScheduleSettings,
    proposed: &TimeSpan,
    exclude_id: Option<&str>,
) -> Result<Vec<CalendarEvent>, ToolError> {
    let window = search_window(proposed, settings.conflict_buffer);
    let nearby = calendar
        .list_events(EventQuery {
            time_min: window.start.fixed_offset(),
            time_max: Some(window.end.fixed_offset()),
            max_results: CONFLICT_SCAN_LIMIT,
        })
        .await?;

    let conflicts: Vec<CalendarEvent> =
        find_conflicts(&nearby, proposed, settings.conflict_buffer, exclude_id)
            .into_iter()
            .cloned()
            .collect();
    debug!(
        scanned = nearby.len(),
        conflicts = conflicts.len(),
        "Conflict check"
    );
    Ok(conflicts)
}

/// Payload asking the model to confirm before writing.
pub fn needs_confirmation(conflicts: &[CalendarEvent]) -> serde_json::Value {
    serde_json::json!({
        "status": "needs_confirmation",
        "message": "The proposed time is within the buffer of existing events. \
                    Ask the user to confirm, then call again with confirmed = true.",
        "conflicts": conflicts,
    })
}
