//! # CalMate Core
//!
//! Domain types, traits, and error definitions for the CalMate calendar
//! assistant. Every external collaborator (language model, calendar,
//! session storage) is a trait here; implementations live in their own
//! crates and everything depends inward on core.

pub mod calendar;
pub mod error;
pub mod event;
pub mod executor;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use calendar::{CalendarBackend, CalendarEvent, EventQuery, EventTime, NewEvent, TimeSpan};
pub use error::{AgentError, Error, Result};
pub use event::{DomainEvent, EventBus};
pub use executor::ToolExecutor;
pub use message::{Conversation, Message, MessageToolCall, Role, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use session::{SessionLease, SessionStore};
pub use tool::{
    FailureKind, ParamSpec, ParamType, Tool, ToolInvocation, ToolOutcome, ToolRegistry,
    ToolResult, ToolSpec,
};
