//! get_event: one event by id.

use async_trait::async_trait;
use calmate_core::calendar::CalendarBackend;
use calmate_core::error::ToolError;
use calmate_core::tool::{ParamSpec, ParamType, Tool, ToolSpec, parse_args};
use serde::Deserialize;
use std::sync::Arc;

pub struct GetEventTool {
    spec: ToolSpec,
    calendar: Arc<dyn CalendarBackend>,
}

#[derive(Deserialize)]
struct Args {
    event_id: String,
}

impl GetEventTool {
    pub fn new(calendar: Arc<dyn CalendarBackend>) -> Self {
        let spec = ToolSpec::new(
            "get_event",
            "Fetch the full details of one event. The event_id comes from list_events; \
             never ask the user for it.",
        )
        .param(ParamSpec::required(
            "event_id",
            ParamType::String,
            "Id of the event, as returned by list_events",
        ));

        Self { spec, calendar }
    }
}

#[async_trait]
impl Tool for GetEventTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = parse_args(arguments)?;
        let event = self.calendar.get_event(&args.event_id).await?;
        serde_json::to_value(event).map_err(|e| ToolError::Backend(e.to_string()))
    }
}
