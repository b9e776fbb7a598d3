//! list_events: events in a time range, soonest first.

use async_trait::async_trait;
use calmate_core::calendar::{CalendarBackend, EventQuery};
use calmate_core::error::ToolError;
use calmate_core::tool::{ParamSpec, ParamType, Tool, ToolSpec, parse_args};
use serde::Deserialize;
use std::sync::Arc;

use crate::schedule::{ScheduleSettings, parse_time};

const DEFAULT_MAX_RESULTS: u32 = 10;
const MAX_RESULTS_CAP: u32 = 250;

pub struct ListEventsTool {
    spec: ToolSpec,
    calendar: Arc<dyn CalendarBackend>,
    settings: ScheduleSettings,
}

#[derive(Deserialize)]
struct Args {
    time_min: String,
    #[serde(default)]
    time_max: Option<String>,
    #[serde(default)]
    max_results: Option<u32>,
}

impl ListEventsTool {
    pub fn new(calendar: Arc<dyn CalendarBackend>, settings: ScheduleSettings) -> Self {
        let spec = ToolSpec::new(
            "list_events",
            "List calendar events that end after time_min (and start before time_max, if \
             given), soonest first. Use this to see what is on the calendar and to find \
             the event_id of an event before reading, editing or deleting it. For a \
             single day, pass that day's start and end from current_time.",
        )
        .param(ParamSpec::required(
            "time_min",
            ParamType::String,
            "Lower bound, RFC3339 (e.g. 2026-10-19T00:00:00-04:00)",
        ))
        .param(ParamSpec::optional(
            "time_max",
            ParamType::String,
            "Upper bound, RFC3339",
        ))
        .param(
            ParamSpec::optional(
                "max_results",
                ParamType::Integer,
                "Maximum number of events to return",
            )
            .with_default(serde_json::json!(DEFAULT_MAX_RESULTS)),
        );

        Self {
            spec,
            calendar,
            settings,
        }
    }
}

#[async_trait]
impl Tool for ListEventsTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = parse_args(arguments)?;
        let tz = self.settings.default_timezone;

        let time_min = parse_time("time_min", &args.time_min, tz)?;
        let time_max = args
            .time_max
            .as_deref()
            .map(|v| parse_time("time_max", v, tz))
            .transpose()?;
        if time_max.is_some_and(|max| max <= time_min) {
            return Err(ToolError::InvalidArguments(
                "'time_max' must be after 'time_min'".into(),
            ));
        }

        let max_results = args
            .max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_CAP);

        let events = self
            .calendar
            .list_events(EventQuery {
                time_min,
                time_max,
                max_results,
            })
            .await?;

        Ok(serde_json::json!({ "events": events }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{calendar_with, timed};

    fn tool(calendar: Arc<dyn CalendarBackend>) -> ListEventsTool {
        ListEventsTool::new(calendar, ScheduleSettings::default())
    }

    #[tokio::test]
    async fn day_bounded_listing() {
        let (calendar, _) = calendar_with(vec![
            timed("Advisor meeting", "2026-10-19T10:00:00-04:00", 60),
            timed("Lab", "2026-10-19T14:00:00-04:00", 120),
            timed("Tomorrow's thing", "2026-10-20T08:00:00-04:00", 30),
        ]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "time_min": "2026-10-19T00:00:00-04:00",
                "time_max": "2026-10-20T00:00:00-04:00"
            }))
            .await
            .unwrap();
        let events = out["events"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["summary"], "Advisor meeting");
        assert_eq!(events[1]["summary"], "Lab");
    }

    #[tokio::test]
    async fn max_results_is_honored() {
        let (calendar, _) = calendar_with(vec![
            timed("A", "2026-10-19T09:00:00-04:00", 30),
            timed("B", "2026-10-19T10:00:00-04:00", 30),
            timed("C", "2026-10-19T11:00:00-04:00", 30),
        ]);
        let out = tool(calendar)
            .execute(serde_json::json!({
                "time_min": "2026-10-19T00:00:00-04:00",
                "max_results": 2
            }))
            .await
            .unwrap();
        assert_eq!(out["events"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn inverted_range_is_invalid() {
        let (calendar, _) = calendar_with(vec![]);
        let err = tool(calendar)
            .execute(serde_json::json!({
                "time_min": "2026-10-20T00:00:00-04:00",
                "time_max": "2026-10-19T00:00:00-04:00"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn empty_calendar_lists_nothing() {
        let (calendar, _) = calendar_with(vec![]);
        let out = tool(calendar)
            .execute(serde_json::json!({"time_min": "2026-10-19"}))
            .await
            .unwrap();
        assert_eq!(out["events"], serde_json::json!([]));
    }
}
