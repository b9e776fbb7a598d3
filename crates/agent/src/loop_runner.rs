//! The agent reasoning loop implementation.

use calmate_core::error::{AgentError, ProviderError};
use calmate_core::event::{DomainEvent, EventBus};
use calmate_core::executor::ToolExecutor;
use calmate_core::message::{Conversation, Message, MessageToolCall, SessionId};
use calmate_core::provider::{Provider, ProviderRequest};
use calmate_core::tool::{FailureKind, ToolInvocation, ToolOutcome, ToolResult};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::directive::SystemDirective;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting on the model.
    Thinking,
    /// Dispatching the model's tool requests.
    Acting,
    /// Appending tool results to the conversation.
    Observing,
    Done,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Thinking => "thinking",
            LoopState::Acting => "acting",
            LoopState::Observing => "observing",
            LoopState::Done => "done",
        };
        f.write_str(s)
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// The final assistant text, verbatim.
    pub reply: String,
    /// Model calls made, including the last one.
    pub cycles: u32,
    /// Tool requests dispatched across all cycles.
    pub tool_calls: usize,
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,

    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    executor: Arc<ToolExecutor>,

    directive: SystemDirective,

    /// Maximum model calls per user message
    max_cycles: u32,

    model_timeout: Duration,

    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        executor: Arc<ToolExecutor>,
        directive: SystemDirective,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            executor,
            directive,
            max_cycles: 10,
            model_timeout: Duration::from_secs(60),
            event_bus,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: Option<u32>) -> Self {
        self.max_tokens = max;
        self
    }

    /// Set the maximum number of model calls per message.
    pub fn with_max_cycles(mut self, max: u32) -> Self {
        self.max_cycles = max;
        self
    }

    /// Bound each model call.
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Drive the conversation until the model answers without tool calls.
    ///
    /// The last turn of `conversation` is expected to be the user's message.
    /// Every turn produced along the way is appended to `conversation`,
    /// including on failure.
    pub async fn run(
        &self,
        session_id: &SessionId,
        conversation: &mut Conversation,
    ) -> Result<LoopOutcome, AgentError> {
        info!(session = %session_id, turns = conversation.len(), "Agent run started");

        let tool_definitions = self.executor.registry().definitions();
        let system = Message::system(self.directive.render());
        let mut tool_calls = 0usize;

        for cycle in 1..=self.max_cycles {
            debug!(session = %session_id, cycle, state = %LoopState::Thinking, "Agent cycle");

            let mut messages = Vec::with_capacity(conversation.len() + 1);
            messages.push(system.clone());
            messages.extend(conversation.messages.iter().cloned());

            let request = ProviderRequest {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = match self.think(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(session = %session_id, cycle, error = %e, "Model call failed");
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: format!("session {session_id}"),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(AgentError::ModelUnavailable(e));
                }
            };

            if let Some(usage) = &response.usage {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    session_id: session_id.to_string(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: Utc::now(),
                });
            }

            let mut message = response.message;
            if message.tool_calls.is_empty() {
                let reply = message.content.clone();
                conversation.push(message);
                info!(session = %session_id, cycles = cycle, tool_calls, state = %LoopState::Done, "Agent run finished");
                return Ok(LoopOutcome {
                    reply,
                    cycles: cycle,
                    tool_calls,
                });
            }

            ensure_unique_ids(&mut message.tool_calls);
            let requests = message.tool_calls.clone();
            conversation.push(message);

            debug!(session = %session_id, cycle, requested = requests.len(), state = %LoopState::Acting, "Dispatching tools");
            let results = self.act(&requests).await;
            tool_calls += requests.len();

            debug!(session = %session_id, cycle, state = %LoopState::Observing, "Appending tool results");
            for result in &results {
                if let Err(e) = conversation.push_tool_result(result) {
                    warn!(session = %session_id, expected = ?e.expected, got = %e.got, "Tool result out of order");
                    conversation.push(Message::tool_result(result));
                }
            }
        }

        warn!(session = %session_id, limit = self.max_cycles, "Cycle limit reached");
        self.event_bus.publish(DomainEvent::CycleLimitReached {
            session_id: session_id.to_string(),
            limit: self.max_cycles,
            timestamp: Utc::now(),
        });
        Err(AgentError::CycleLimitExceeded {
            limit: self.max_cycles,
        })
    }

    async fn think(
        &self,
        request: ProviderRequest,
    ) -> Result<calmate_core::provider::ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.model_timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "no response from {} within {}s",
                self.provider.name(),
                self.model_timeout.as_secs()
            ))),
        }
    }

    /// Run one batch of requests. Results come back in request order.
    async fn act(&self, requests: &[MessageToolCall]) -> Vec<ToolResult> {
        let parsed: Vec<Result<ToolInvocation, ToolResult>> = requests.iter().map(to_invocation).collect();
        let runnable: Vec<ToolInvocation> = parsed
            .iter()
            .filter_map(|p| p.as_ref().ok().cloned())
            .collect();

        let mut executed = self.executor.invoke_all(&runnable).await.into_iter();
        parsed
            .into_iter()
            .map(|p| match p {
                Ok(invocation) => executed.next().unwrap_or_else(|| ToolResult {
                    call_id: invocation.call_id,
                    outcome: ToolOutcome::failure(FailureKind::BackendFailure, "tool produced no result"),
                }),
                Err(rejected) => rejected,
            })
            .collect()
    }
}

/// Parse the model's argument string. Blank means no arguments.
fn to_invocation(call: &MessageToolCall) -> Result<ToolInvocation, ToolResult> {
    let raw = call.arguments.trim();
    let arguments = if raw.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(raw).map_err(|e| ToolResult {
            call_id: call.id.clone(),
            outcome: ToolOutcome::failure(
                FailureKind::InvalidArguments,
                format!("arguments are not valid JSON: {e}"),
            ),
        })?
    };
    Ok(ToolInvocation {
        call_id: call.id.clone(),
        tool_name: call.name.clone(),
        arguments,
    })
}

/// Results are matched to requests by id, so every id in a batch must differ.
fn ensure_unique_ids(calls: &mut [MessageToolCall]) {
    let mut seen = HashSet::new();
    for call in calls.iter_mut() {
        if call.id.is_empty() || !seen.insert(call.id.clone()) {
            call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
            seen.insert(call.id.clone());
        }
    }
}
