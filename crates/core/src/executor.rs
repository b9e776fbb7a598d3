//! Tool dispatch: looks up handlers, validates arguments, and turns every
//! kind of failure into a `ToolResult` the agent loop can fold back into
//! the conversation.

use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::event::{DomainEvent, EventBus};
use crate::tool::{FailureKind, ToolInvocation, ToolOutcome, ToolRegistry, ToolResult};

/// Invokes tools by name. Never returns an error.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    event_bus: Option<Arc<EventBus>>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(30),
            event_bus: None,
        }
    }

    /// Set the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Publish a `ToolExecuted` event for every invocation.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one invocation.
    pub async fn invoke(&self, invocation: &ToolInvocation) -> ToolResult {
        let start = Instant::now();
        let outcome = self.dispatch(invocation).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            ToolOutcome::Success { .. } => {
                debug!(tool = %invocation.tool_name, call_id = %invocation.call_id, duration_ms, "Tool succeeded");
            }
            ToolOutcome::Failure { kind, message } => {
                warn!(tool = %invocation.tool_name, call_id = %invocation.call_id, ?kind, error = %message, "Tool failed");
            }
        }

        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ToolExecuted {
                tool_name: invocation.tool_name.clone(),
                success: outcome.is_success(),
                duration_ms,
                timestamp: chrono::Utc::now(),
            });
        }

        ToolResult {
            call_id: invocation.call_id.clone(),
            outcome,
        }
    }

    /// Run a batch concurrently. Results come back in request order.
    pub async fn invoke_all(&self, invocations: &[ToolInvocation]) -> Vec<ToolResult> {
        join_all(invocations.iter().map(|inv| self.invoke(inv))).await
    }

    async fn dispatch(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let Some(tool) = self.registry.get(&invocation.tool_name) else {
            return ToolOutcome::failure(
                FailureKind::UnknownTool,
                format!("Unknown tool: {}", invocation.tool_name),
            );
        };

        if let Err(reason) = tool.spec().validate(&invocation.arguments) {
            return ToolOutcome::failure(FailureKind::InvalidArguments, reason);
        }

        let run = AssertUnwindSafe(tool.execute(invocation.arguments.clone())).catch_unwind();
        match tokio::time::timeout(self.timeout, run).await {
            Err(_) => ToolOutcome::failure(
                FailureKind::BackendFailure,
                format!(
                    "Tool '{}' timed out after {}s",
                    invocation.tool_name,
                    self.timeout.as_secs()
                ),
            ),
            Ok(Err(panic)) => ToolOutcome::failure(FailureKind::BackendFailure, panic_message(&*panic)),
            Ok(Ok(Ok(payload))) => ToolOutcome::success(payload),
            Ok(Ok(Err(ToolError::InvalidArguments(reason)))) => {
                ToolOutcome::failure(FailureKind::InvalidArguments, reason)
            }
            Ok(Ok(Err(ToolError::Backend(message)))) => {
                ToolOutcome::failure(FailureKind::BackendFailure, message)
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool handler panicked".into()
    }
}
