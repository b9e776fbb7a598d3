//! Error types for the CalMate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `Error` wraps them all.

use thiserror::Error;

/// The top-level error type for all CalMate operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Tool registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors raised by a tool handler.
///
/// The executor folds these into a `ToolResult` failure; they never
/// escape to the agent loop.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// An upstream call failed. The message is passed to the model verbatim.
    #[error("{0}")]
    Backend(String),
}

impl From<CalendarError> for ToolError {
    fn from(err: CalendarError) -> Self {
        ToolError::Backend(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),
}

#[derive(Debug, Clone, Error)]
pub enum CalendarError {
    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Calendar API error ({status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("Calendar authentication failed: {0}")]
    Auth(String),

    #[error("Calendar network error: {0}")]
    Network(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session id must not be empty")]
    EmptyId,

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Failures that end an agent run without a reply.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model could not be reached or did not answer in time.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ProviderError),

    #[error("Exceeded the limit of {limit} tool cycles for one message")]
    CycleLimitExceeded { limit: u32 },

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}
