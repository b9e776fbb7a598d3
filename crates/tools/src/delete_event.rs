//! delete_event: remove one event by id.

use async_trait::async_trait;
use calmate_core::calendar::CalendarBackend;
use calmate_core::error::ToolError;
use calmate_core::tool::{ParamSpec, ParamType, Tool, ToolSpec, parse_args};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub struct DeleteEventTool {
    spec: ToolSpec,
    calendar: Arc<dyn CalendarBackend>,
}

#[derive(Deserialize)]
struct Args {
    event_id: String,
}

impl DeleteEventTool {
    pub fn new(calendar: Arc<dyn CalendarBackend>) -> Self {
        let spec = ToolSpec::new(
            "delete_event",
            "Delete one event. Find the event_id with list_events first and confirm with \
             the user which event is meant when more than one matches.",
        )
        .param(ParamSpec::required(
            "event_id",
            ParamType::String,
            "Id of the event to delete",
        ));

        Self { spec, calendar }
    }
}

#[async_trait]
impl Tool for DeleteEventTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = parse_args(arguments)?;
        self.calendar.delete_event(&args.event_id).await?;
        info!(event_id = %args.event_id, "Event deleted");
        Ok(serde_json::json!({ "status": "deleted", "event_id": args.event_id }))
    }
}
