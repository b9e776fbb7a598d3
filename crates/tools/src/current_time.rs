//! current_time: the present moment and today's bounds in a named zone.
//!
//! The model has no clock of its own; every relative phrase ("today",
//! "tomorrow at 3") is resolved against this tool's answer.

use async_trait::async_trait;
use calmate_core::calendar::today;
use calmate_core::error::ToolError;
use calmate_core::tool::{ParamSpec, ParamType, Tool, ToolSpec, parse_args};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::schedule::ScheduleSettings;

/// Source of "now". Swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct CurrentTimeTool {
    spec: ToolSpec,
    settings: ScheduleSettings,
    clock: Clock,
}

#[derive(Deserialize)]
struct Args {
    #[serde(default)]
    timezone: Option<String>,
}

impl CurrentTimeTool {
    pub fn new(settings: ScheduleSettings) -> Self {
        let spec = ToolSpec::new(
            "current_time",
            "Get the current date and time in a time zone, plus the start and end of \
             today in that zone. Call this before interpreting any relative date such as \
             'today', 'tomorrow' or 'next Monday'.",
        )
        .param(
            ParamSpec::optional(
                "timezone",
                ParamType::String,
                "IANA time zone name, e.g. America/New_York",
            )
            .with_default(serde_json::json!(settings.default_timezone.name())),
        );

        Self {
            spec,
            settings,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = parse_args(arguments)?;
        let tz = self.settings.zone(args.timezone.as_deref())?;
        let now = (self.clock)();
        let local = now.with_timezone(&tz);
        let window = today(now, tz);

        Ok(serde_json::json!({
            "timezone": tz.name(),
            "now": local.to_rfc3339_opts(SecondsFormat::Secs, false),
            "weekday": local.format("%A").to_string(),
            "today": {
                "date": window.date.to_string(),
                "start": window.start.to_rfc3339_opts(SecondsFormat::Secs, false),
                "end": window.end.to_rfc3339_opts(SecondsFormat::Secs, false),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_tool(now: &str) -> CurrentTimeTool {
        let instant = DateTime::parse_from_rfc3339(now).unwrap().with_timezone(&Utc);
        CurrentTimeTool::new(ScheduleSettings::default()).with_clock(Arc::new(move || instant))
    }

    #[tokio::test]
    async fn defaults_to_new_york() {
        let tool = fixed_tool("2026-10-19T16:30:00Z");
        let out = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(out["timezone"], "America/New_York");
        assert_eq!(out["now"], "2026-10-19T12:30:00-04:00");
        assert_eq!(out["weekday"], "Monday");
        assert_eq!(out["today"]["date"], "2026-10-19");
        assert_eq!(out["today"]["start"], "2026-10-19T00:00:00-04:00");
        assert_eq!(out["today"]["end"], "2026-10-20T00:00:00-04:00");
    }

    #[tokio::test]
    async fn local_date_can_differ_from_utc_date() {
        // 02:00 UTC on the 20th is still the 19th in New York.
        let tool = fixed_tool("2026-10-20T02:00:00Z");
        let out = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(out["today"]["date"], "2026-10-19");

        let tokyo = tool
            .execute(serde_json::json!({"timezone": "Asia/Tokyo"}))
            .await
            .unwrap();
        assert_eq!(tokyo["today"]["date"], "2026-10-20");
        assert_eq!(tokyo["today"]["start"], "2026-10-20T00:00:00+09:00");
    }

    #[tokio::test]
    async fn null_timezone_uses_default() {
        let tool = fixed_tool("2026-10-19T16:30:00Z");
        let out = tool
            .execute(serde_json::json!({"timezone": null}))
            .await
            .unwrap();
        assert_eq!(out["timezone"], "America/New_York");
    }

    #[tokio::test]
    async fn unknown_zone_is_invalid_arguments() {
        let tool = fixed_tool("2026-10-19T16:30:00Z");
        let err = tool
            .execute(serde_json::json!({"timezone": "Atlantis/Central"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn spec_advertises_default_zone() {
        let tool = CurrentTimeTool::new(ScheduleSettings::default());
        let schema = tool.spec().parameters_schema();
        assert_eq!(schema["properties"]["timezone"]["default"], "America/New_York");
    }
}
