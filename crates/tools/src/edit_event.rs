//! edit_event: read-modify-write of an existing event.
//!
//! Fields the model leaves out keep their current values. Moving the start
//! without giving an end keeps the event's duration. A new `timezone` on its
//! own keeps the wall-clock times and reads them in the new zone, so
//! "14:00 New York" becomes "14:00 London".

use async_trait::async_trait;
use calmate_core::calendar::{CalendarBackend, EventTime};
use calmate_core::error::ToolError;
use calmate_core::tool::{ParamSpec, ParamType, Tool, ToolSpec, parse_args};
use crate::schedule::wall_clock_in;
use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::create_event::{attendees_from, event_params};
use crate::schedule::{
    ScheduleSettings, check_color, conflicts_for, needs_confirmation, parse_time, span_of,
};

pub struct EditEventTool {
    spec: ToolSpec,
    calendar: Arc<dyn CalendarBackend>,
    settings: ScheduleSettings,
}

#[derive(Deserialize)]
struct Args {
    event_id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    recurrence: Option<Vec<String>>,
    #[serde(default)]
    attendees: Option<Vec<String>>,
    #[serde(default)]
    color_id: Option<String>,
    #[serde(default)]
    confirmed: Option<bool>,
}

impl EditEventTool {
    pub fn new(calendar: Arc<dyn CalendarBackend>, settings: ScheduleSettings) -> Self {
        let spec = ToolSpec::new(
            "edit_event",
            "Change an existing event. Look up the event_id with list_events first. Pass \
             only the fields that change. If the result has status \"needs_confirmation\", \
             tell the user about the conflicts and call again with confirmed = true only \
             if they agree.",
        )
        .param(ParamSpec::required(
            "event_id",
            ParamType::String,
            "Id of the event to change",
        ))
        .param(ParamSpec::optional("summary", ParamType::String, "New title"))
        .param(ParamSpec::optional(
            "start",
            ParamType::String,
            "New start time, RFC3339. Without an end the duration is kept",
        ));

        Self {
            spec: event_params(spec),
            calendar,
            settings,
        }
    }
}

#[async_trait]
impl Tool for EditEventTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = parse_args(arguments)?;
        let current = self.calendar.get_event(&args.event_id).await?;
        let mut body = current.to_new();

        let requested = args.timezone.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let tz = self
            .settings
            .zone(requested.or(current.start.time_zone.as_deref()))?;

        let rezoned =
            requested.is_some() && current.start.time_zone.as_deref() != Some(tz.name());
        let moved = args.start.is_some() || args.end.is_some() || rezoned;
        if moved {
            let (mut old_start, mut old_end) = (current.start.date_time, current.end.date_time);
            if rezoned {
                old_start = old_start.map(|dt| wall_clock_in("start", dt, tz)).transpose()?;
                old_end = old_end.map(|dt| wall_clock_in("end", dt, tz)).transpose()?;
            }

            let start = match args.start.as_deref() {
                Some(s) => parse_time("start", s, tz)?,
                None => old_start.ok_or_else(|| {
                    ToolError::InvalidArguments(
                        "this is an all-day event; give a new 'start' along with 'end'".into(),
                    )
                })?,
            };
            let end = match (args.end.as_deref(), old_start.zip(old_end)) {
                (Some(e), _) => parse_time("end", e, tz)?,
                (None, Some((s, e))) => start + (e - s),
                (None, None) => start + Duration::hours(1),
            };

            let span = span_of(start, end)?;
            if !args.confirmed.unwrap_or(false) {
                let conflicts =
                    conflicts_for(&self.calendar, &self.settings, &span, Some(current.id.as_str())).await?;
                if !conflicts.is_empty() {
                    info!(event_id = %current.id, conflicts = conflicts.len(), "Edit held for confirmation");
                    return Ok(needs_confirmation(&conflicts));
                }
            }

            body.start = EventTime::at(start, tz.name());
            body.end = EventTime::at(end, tz.name());
        }

        if let Some(color_id) = args.color_id {
            check_color(&color_id)?;
            body.color_id = Some(color_id);
        }
        if let Some(summary) = args.summary {
            body.summary = summary;
        }
        if let Some(location) = args.location {
            body.location = location;
        }
        if let Some(description) = args.description {
            body.description = description;
        }
        if let Some(recurrence) = args.recurrence {
            body.recurrence = recurrence;
        }
        if let Some(attendees) = args.attendees {
            body.attendees = attendees_from(attendees);
        }

        let updated = self.calendar.update_event(&current.id, body).await?;
        info!(event_id = %updated.id, moved, "Event updated");
        Ok(serde_json::json!({ "status": "updated", "event": updated }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{calendar_with, timed};

    fn tool(calendar: Arc<dyn CalendarBackend>) -> EditEventTool {
        EditEventTool::new(calendar, ScheduleSettings::default())
    }

    #[tokio::test]
    async fn moving_start_keeps_duration() {
        let (calendar, _) = calendar_with(vec![timed("Lab", "2026-10-19T14:00:00-04:00", 90)]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "event_id": "evt_1",
                "start": "2026-10-21T09:00:00-04:00"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "updated");
        assert_eq!(out["event"]["id"], "evt_1");
        assert_eq!(out["event"]["end"]["dateTime"], "2026-10-21T10:30:00-04:00");
        assert_eq!(out["event"]["summary"], "Lab");
    }

    #[tokio::test]
    async fn untouched_fields_are_preserved() {
        let mut lab = timed("Lab", "2026-10-19T14:00:00-04:00", 60);
        lab.location = "Room 204".into();
        let (calendar, memory) = calendar_with(vec![lab]);
        let out = tool(calendar)
            .execute(serde_json::json!({"event_id": "evt_1", "summary": "Chem lab"}))
            .await
            .unwrap();
        assert_eq!(out["event"]["summary"], "Chem lab");
        assert_eq!(out["event"]["location"], "Room 204");
        assert_eq!(out["event"]["start"]["dateTime"], "2026-10-19T14:00:00-04:00");
        assert_eq!(memory.write_count(), 1);
    }

    #[tokio::test]
    async fn moving_next_to_another_event_needs_confirmation() {
        let (calendar, memory) = calendar_with(vec![
            timed("Advisor meeting", "2026-10-19T10:00:00-04:00", 60),
            timed("Coffee", "2026-10-19T15:00:00-04:00", 30),
        ]);
        let out = tool(calendar.clone())
            .execute(serde_json::json!({
                "event_id": "evt_2",
                "start": "2026-10-19T11:15:00-04:00"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "needs_confirmation");
        assert_eq!(out["conflicts"].as_array().unwrap().len(), 1);
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn event_does_not_conflict_with_itself() {
        let (calendar, _) = calendar_with(vec![timed("Lab", "2026-10-19T14:00:00-04:00", 60)]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "event_id": "evt_1",
                "start": "2026-10-19T14:15:00-04:00"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "updated");
    }

    #[tokio::test]
    async fn timezone_alone_rereads_wall_clock_in_new_zone() {
        let (calendar, memory) = calendar_with(vec![timed("Lab", "2026-10-19T14:00:00-04:00", 60)]);
        let out = tool(calendar)
            .execute(serde_json::json!({"event_id": "evt_1", "timezone": "Europe/London"}))
            .await
            .unwrap();
        assert_eq!(out["status"], "updated");
        assert_eq!(out["event"]["start"]["timeZone"], "Europe/London");
        assert_eq!(out["event"]["start"]["dateTime"], "2026-10-19T14:00:00+01:00");
        assert_eq!(out["event"]["end"]["dateTime"], "2026-10-19T15:00:00+01:00");
        assert_eq!(memory.write_count(), 1);
    }

    #[tokio::test]
    async fn timezone_change_is_conflict_checked() {
        // 14:00 London is 09:00 New York, 15 minutes after standup ends.
        let (calendar, memory) = calendar_with(vec![
            timed("Lab", "2026-10-19T14:00:00-04:00", 60),
            timed("Standup", "2026-10-19T08:00:00-04:00", 45),
        ]);
        let out = tool(calendar)
            .execute(serde_json::json!({"event_id": "evt_1", "timezone": "Europe/London"}))
            .await
            .unwrap();
        assert_eq!(out["status"], "needs_confirmation");
        assert_eq!(out["conflicts"][0]["summary"], "Standup");
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn same_timezone_is_not_a_move() {
        let (calendar, _) = calendar_with(vec![timed("Lab", "2026-10-19T14:00:00-04:00", 60)]);
        let out = tool(calendar)
            .execute(serde_json::json!({"event_id": "evt_1", "timezone": "America/New_York"}))
            .await
            .unwrap();
        assert_eq!(out["event"]["start"]["dateTime"], "2026-10-19T14:00:00-04:00");
    }

    #[tokio::test]
    async fn unknown_event_is_a_backend_error() {
        let (calendar, _) = calendar_with(vec![]);
        let err = tool(calendar)
            .execute(serde_json::json!({"event_id": "evt_7", "summary": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Backend(_)));
    }
}
