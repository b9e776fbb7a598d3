//! Conflict detection for proposed events.
//!
//! An existing event conflicts with a proposal when the two overlap, or
//! when the gap between the existing event's end and the proposal's start
//! (or the proposal's end and the existing event's start) is shorter than
//! the buffer. A gap equal to the buffer is allowed.

use chrono::Duration;

use super::{CalendarEvent, TimeSpan};

pub const DEFAULT_BUFFER_MINUTES: i64 = 30;

/// Whether an occupied span is too close to a proposed one.
pub fn too_close(existing: &TimeSpan, proposed: &TimeSpan, buffer: Duration) -> bool {
    existing.start < proposed.end + buffer && existing.end > proposed.start - buffer
}

/// The window to query before scheduling `proposed`.
pub fn search_window(proposed: &TimeSpan, buffer: Duration) -> TimeSpan {
    TimeSpan {
        start: proposed.start - buffer,
        end: proposed.end + buffer,
    }
}

/// Existing timed events that conflict with `proposed`.
///
/// All-day events are not considered. `exclude_id` skips the event being
/// edited.
pub fn find_conflicts<'a>(
    existing: &'a [CalendarEvent],
    proposed: &TimeSpan,
    buffer: Duration,
    exclude_id: Option<&str>,
) -> Vec<&'a CalendarEvent> {
    existing
        .iter()
        .filter(|e| exclude_id != Some(e.id.as_str()))
        .filter(|e| e.span().is_some_and(|span| too_close(&span, proposed, buffer)))
        .collect()
}
