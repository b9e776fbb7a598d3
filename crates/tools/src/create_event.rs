//! create_event: add an event, refusing to write next to existing events
//! until the user has confirmed.

use async_trait::async_trait;
use calmate_core::calendar::{Attendee, CalendarBackend, EventTime, NewEvent};
use calmate_core::error::ToolError;
use calmate_core::tool::{ParamSpec, ParamType, Tool, ToolSpec, parse_args};
use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::schedule::{
    DEFAULT_COLOR_ID, ScheduleSettings, check_color, conflicts_for, needs_confirmation, parse_time,
    span_of,
};

/// Colour guide shown to the model for `color_id`.
pub const COLOR_GUIDE: &str = "Colour tag: \"9\" classes, \"3\" academics, \"5\" social, \
     \"11\" important, \"8\" not attending, \"7\" other";

pub struct CreateEventTool {
    spec: ToolSpec,
    calendar: Arc<dyn CalendarBackend>,
    settings: ScheduleSettings,
}

#[derive(Deserialize)]
struct Args {
    summary: String,
    start: String,
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

/// Parameters shared by create_event and edit_event.
pub(crate) fn event_params(spec: ToolSpec) -> ToolSpec {
    spec.param(ParamSpec::optional(
        "end",
        ParamType::String,
        "End time, RFC3339. Defaults to one hour after start",
    ))
    .param(ParamSpec::optional(
        "location",
        ParamType::String,
        "Where the event takes place",
    ))
    .param(ParamSpec::optional(
        "description",
        ParamType::String,
        "Notes for the event",
    ))
    .param(ParamSpec::optional(
        "timezone",
        ParamType::String,
        "IANA time zone of start and end, e.g. America/New_York",
    ))
    .param(
        ParamSpec::optional(
            "recurrence",
            ParamType::Array,
            "RFC 5545 recurrence lines, e.g. [\"RRULE:FREQ=WEEKLY;COUNT=10\"]",
        )
        .with_items(serde_json::json!({"type": "string"})),
    )
    .param(
        ParamSpec::optional("attendees", ParamType::Array, "Attendee email addresses")
            .with_items(serde_json::json!({"type": "string"})),
    )
    .param(ParamSpec::optional("color_id", ParamType::String, COLOR_GUIDE))
    .param(ParamSpec::optional(
        "confirmed",
        ParamType::Boolean,
        "Set to true only after the user has approved a time that conflicts with \
         existing events",
    ))
}

pub(crate) fn attendees_from(emails: Vec<String>) -> Vec<Attendee> {
    emails
        .into_iter()
        .map(|email| Attendee {
            email,
            ..Default::default()
        })
        .collect()
}

impl CreateEventTool {
    pub fn new(calendar: Arc<dyn CalendarBackend>, settings: ScheduleSettings) -> Self {
        let spec = ToolSpec::new(
            "create_event",
            "Create a calendar event. Only the start time must come from the user; infer \
             the title and the other fields. If the result has status \
             \"needs_confirmation\", tell the user about the listed conflicts and call \
             again with confirmed = true only if they agree.",
        )
        .param(ParamSpec::required(
            "summary",
            ParamType::String,
            "Event title",
        ))
        .param(ParamSpec::required(
            "start",
            ParamType::String,
            "Start time, RFC3339 (e.g. 2026-10-20T14:00:00-04:00)",
        ));

        Self {
            spec: event_params(spec),
            calendar,
            settings,
        }
    }
}

#[async_trait]
impl Tool for CreateEventTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = parse_args(arguments)?;
        let tz = self.settings.zone(args.timezone.as_deref())?;

        let start = parse_time("start", &args.start, tz)?;
        let end = match args.end.as_deref() {
            Some(end) => parse_time("end", end, tz)?,
            None => start + Duration::hours(1),
        };
        let span = span_of(start, end)?;

        let color_id = args.color_id.unwrap_or_else(|| DEFAULT_COLOR_ID.to_string());
        check_color(&color_id)?;

        if !args.confirmed.unwrap_or(false) {
            let conflicts = conflicts_for(&self.calendar, &self.settings, &span, None).await?;
            if !conflicts.is_empty() {
                info!(summary = %args.summary, conflicts = conflicts.len(), "Create held for confirmation");
                return Ok(needs_confirmation(&conflicts));
            }
        }

        let event = NewEvent {
            summary: args.summary,
            location: args.location.unwrap_or_default(),
            description: args.description.unwrap_or_default(),
            start: EventTime::at(start, tz.name()),
            end: EventTime::at(end, tz.name()),
            recurrence: args.recurrence.unwrap_or_default(),
            attendees: attendees_from(args.attendees.unwrap_or_default()),
            color_id: Some(color_id),
        };

        let created = self.calendar.create_event(event).await?;
        info!(event_id = %created.id, summary = %created.summary, "Event created");
        Ok(serde_json::json!({ "status": "created", "event": created }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{calendar_with, timed};
    use calmate_core::executor::ToolExecutor;
    use calmate_core::tool::{FailureKind, ToolInvocation, ToolRegistry};

    fn tool(calendar: Arc<dyn CalendarBackend>) -> CreateEventTool {
        CreateEventTool::new(calendar, ScheduleSettings::default())
    }

    #[tokio::test]
    async fn end_defaults_to_one_hour() {
        let (calendar, _) = calendar_with(vec![]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "summary": "Study group",
                "start": "2026-10-20T14:00"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "created");
        assert_eq!(out["event"]["id"], "evt_1");
        assert_eq!(out["event"]["start"]["dateTime"], "2026-10-20T14:00:00-04:00");
        assert_eq!(out["event"]["end"]["dateTime"], "2026-10-20T15:00:00-04:00");
        assert_eq!(out["event"]["start"]["timeZone"], "America/New_York");
        assert_eq!(out["event"]["colorId"], "7");
    }

    #[tokio::test]
    async fn close_neighbour_needs_confirmation() {
        let (calendar, memory) = calendar_with(vec![timed(
            "Advisor meeting",
            "2026-10-19T10:00:00-04:00",
            60,
        )]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "summary": "Coffee",
                "start": "2026-10-19T11:20:00-04:00",
                "end": "2026-10-19T12:00:00-04:00"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "needs_confirmation");
        assert_eq!(out["conflicts"][0]["summary"], "Advisor meeting");
        assert_eq!(memory.write_count(), 0);
    }

    #[tokio::test]
    async fn confirmed_create_goes_through() {
        let (calendar, memory) = calendar_with(vec![timed(
            "Advisor meeting",
            "2026-10-19T10:00:00-04:00",
            60,
        )]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "summary": "Coffee",
                "start": "2026-10-19T11:20:00-04:00",
                "end": "2026-10-19T12:00:00-04:00",
                "confirmed": true
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "created");
        assert_eq!(memory.write_count(), 1);
    }

    #[tokio::test]
    async fn buffer_respecting_time_is_clear() {
        let (calendar, memory) = calendar_with(vec![timed(
            "Advisor meeting",
            "2026-10-19T10:00:00-04:00",
            60,
        )]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "summary": "Coffee",
                "start": "2026-10-19T11:35:00-04:00",
                "end": "2026-10-19T12:00:00-04:00"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "created");
        assert_eq!(memory.write_count(), 1);
    }

    #[tokio::test]
    async fn missing_start_never_reaches_the_calendar() {
        let (calendar, memory) = calendar_with(vec![]);
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(tool(calendar))).unwrap();
        let executor = ToolExecutor::new(Arc::new(registry));

        let result = executor
            .invoke(&ToolInvocation {
                call_id: "c1".into(),
                tool_name: "create_event".into(),
                arguments: serde_json::json!({"summary": "Dentist"}),
            })
            .await;
        assert_eq!(result.outcome.failure_kind(), Some(FailureKind::InvalidArguments));
        assert_eq!(memory.write_count(), 0);
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn attendees_and_recurrence_are_kept() {
        let (calendar, _) = calendar_with(vec![]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "summary": "CS 101",
                "start": "2026-10-20T09:00:00-04:00",
                "end": "2026-10-20T10:15:00-04:00",
                "recurrence": ["RRULE:FREQ=WEEKLY;BYDAY=TU,TH;COUNT=20"],
                "attendees": ["ta@example.edu"],
                "color_id": "9"
            }))
            .await
            .unwrap();
        assert_eq!(out["event"]["recurrence"][0], "RRULE:FREQ=WEEKLY;BYDAY=TU,TH;COUNT=20");
        assert_eq!(out["event"]["attendees"][0]["email"], "ta@example.edu");
        assert_eq!(out["event"]["colorId"], "9");
    }

    #[tokio::test]
    async fn bad_color_is_invalid_arguments() {
        let (calendar, _) = calendar_with(vec![]);
        let err = tool(calendar)
            .execute(serde_json::json!({
                "summary": "x",
                "start": "2026-10-20T09:00:00-04:00",
                "color_id": "42"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn end_before_start_is_invalid_arguments() {
        let (calendar, _) = calendar_with(vec![]);
        let err = tool(calendar)
            .execute(serde_json::json!({
                "summary": "x",
                "start": "2026-10-20T09:00:00-04:00",
                "end": "2026-10-20T08:00:00-04:00"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
