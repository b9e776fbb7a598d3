//! HTTP front door for CalMate.
//!
//! `POST /chat` takes `{session_id, message}` and answers `{reply}`. Every
//! failure is a JSON `{error}` with a message meant for the end user; raw
//! provider errors only go to the log.
//!
//! Built on Axum.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, error, info, warn};

use calmate_agent::ChatService;
use calmate_config::{AppConfig, GatewayConfig};
use calmate_core::error::{AgentError, SessionError};
use calmate_core::message::{Message, SessionId};
use calmate_core::provider::ToolDefinition;
use calmate_core::session::SessionStore;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub chat: ChatService,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(chat: ChatService) -> Self {
        Self {
            chat,
            started_at: chrono::Utc::now(),
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers: CORS, request body limit, HTTP trace logging.
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/tools", get(tools_handler))
        .route("/sessions/{id}", get(session_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Any origin unless a list is configured.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let chat = ChatService::from_config(&config)?;
    info!(
        model = %chat.model(),
        tools = chat.tools().len(),
        calendar = %config.calendar.backend,
        "Chat service ready"
    );
    let state = Arc::new(GatewayState::new(chat));

    if config.sessions.sweep_interval_secs > 0 {
        spawn_session_sweeper(
            state.chat.sessions().clone(),
            Duration::from_secs(config.sessions.sweep_interval_secs),
        );
    }

    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop idle sessions.
pub fn spawn_session_sweeper(
    sessions: Arc<dyn SessionStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sessions.evict_idle(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(evicted) => info!(evicted, store = sessions.name(), "Swept idle sessions"),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}

// --- Errors ---

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn agent_error(err: &AgentError) -> ApiError {
    match err {
        AgentError::ModelUnavailable(_) => api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "The assistant is temporarily unavailable. Please try again in a moment.",
        ),
        AgentError::CycleLimitExceeded { .. } => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "I couldn't finish that request. Please try rephrasing it or breaking it into smaller steps.",
        ),
        AgentError::EmptyMessage => api_error(StatusCode::BAD_REQUEST, "Message must not be empty."),
        AgentError::Session(SessionError::EmptyId) => {
            api_error(StatusCode::BAD_REQUEST, "session_id must not be empty.")
        }
        AgentError::Session(SessionError::Storage(_)) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Your conversation could not be saved. Please try again.",
        ),
    }
}

// --- Handlers ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected chat body");
        api_error(
            StatusCode::BAD_REQUEST,
            "Expected a JSON body with 'session_id' and 'message'.",
        )
    })?;

    let session_id = SessionId::new(request.session_id.trim());
    info!(session = %session_id, message_len = request.message.len(), "Chat message received");

    match state.chat.handle(&session_id, &request.message).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            reply: outcome.reply,
        })),
        Err(e) => {
            error!(session = %session_id, error = %e, "Chat request failed");
            Err(agent_error(&e))
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    sessions: usize,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.chat.model().to_string(),
        sessions: state.chat.sessions().len().await.unwrap_or(0),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolDefinition>,
    total: usize,
}

async fn tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools = state.chat.tools().definitions();
    Json(ToolListResponse {
        total: tools.len(),
        tools,
    })
}

#[derive(Serialize)]
struct TranscriptResponse {
    session_id: String,
    messages: Vec<Message>,
    created_at: String,
    updated_at: String,
}

async fn session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session_id = SessionId::new(id);
    let conversation = match state.chat.transcript(&session_id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => return Err(api_error(StatusCode::NOT_FOUND, "No such session.")),
        Err(SessionError::EmptyId) => {
            return Err(api_error(StatusCode::BAD_REQUEST, "session_id must not be empty."));
        }
        Err(e) => {
            error!(session = %session_id, error = %e, "Transcript lookup failed");
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not load the session."));
        }
    };

    Ok(Json(TranscriptResponse {
        session_id: session_id.to_string(),
        created_at: conversation.created_at.to_rfc3339(),
        updated_at: conversation.updated_at.to_rfc3339(),
        messages: conversation.messages,
    }))
}
