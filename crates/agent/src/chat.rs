//! Front-door core shared by the HTTP gateway and the terminal chat.
//!
//! One message is handled as: take the session lease, load the
//! conversation, append the user turn, run the loop, save. The lease is
//! held throughout, so messages for one session never interleave.

use calmate_config::AppConfig;
use calmate_core::calendar::CalendarBackend;
use calmate_core::error::{AgentError, Error, SessionError};
use calmate_core::event::{DomainEvent, EventBus};
use calmate_core::executor::ToolExecutor;
use calmate_core::message::{Conversation, Message, SessionId};
use calmate_core::provider::Provider;
use calmate_core::session::SessionStore;
use calmate_core::tool::ToolRegistry;
use calmate_sessions::InMemorySessionStore;
use calmate_tools::{ScheduleSettings, SearchSetup, TavilySearch, calendar_registry};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::directive::SystemDirective;
use crate::loop_runner::{AgentLoop, LoopOutcome};

pub struct ChatService {
    agent: AgentLoop,
    sessions: Arc<dyn SessionStore>,
    event_bus: Arc<EventBus>,
}

impl ChatService {
    pub fn new(agent: AgentLoop, sessions: Arc<dyn SessionStore>, event_bus: Arc<EventBus>) -> Self {
        Self {
            agent,
            sessions,
            event_bus,
        }
    }

    /// Wire the whole runtime from config: provider, calendar backend,
    /// optional web search, and an in-memory session store.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let provider = Arc::new(calmate_providers::build_from_config(config));
        let calendar = calmate_calendar::build_from_config(&config.calendar)?;
        Self::from_parts(config, provider, calendar)
    }

    /// Same as [`ChatService::from_config`] with the model and calendar supplied.
    pub fn from_parts(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        calendar: Arc<dyn CalendarBackend>,
    ) -> Result<Self, Error> {
        let settings = ScheduleSettings::new(
            &config.agent.default_timezone,
            config.agent.conflict_buffer_minutes,
        )
        .map_err(|message| Error::Config { message })?;
        let search = config.search.api_key.as_deref().map(|key| SearchSetup {
            backend: Arc::new(TavilySearch::new(key)),
            default_results: config.search.max_results,
        });
        let registry = calendar_registry(calendar, settings, search)?;

        let event_bus = Arc::new(EventBus::default());
        let executor = Arc::new(
            ToolExecutor::new(Arc::new(registry))
                .with_timeout(Duration::from_secs(config.agent.tool_timeout_secs))
                .with_event_bus(event_bus.clone()),
        );

        let agent = AgentLoop::new(
            provider,
            &config.default_model,
            executor,
            SystemDirective::from_config(config),
            event_bus.clone(),
        )
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens)
        .with_max_cycles(config.agent.max_cycles)
        .with_model_timeout(Duration::from_secs(config.agent.model_timeout_secs));

        let mut store = InMemorySessionStore::new().with_max_turns(config.sessions.max_turns);
        if config.sessions.idle_ttl_minutes > 0 {
            store = store.with_idle_ttl(chrono::Duration::minutes(config.sessions.idle_ttl_minutes as i64));
        }

        Ok(Self::new(agent, Arc::new(store), event_bus))
    }

    /// Handle one user message and return the assistant's reply.
    ///
    /// The message is stored as sent; whitespace-only input is rejected.
    /// Turns appended before a failure are still saved.
    pub async fn handle(&self, session_id: &SessionId, text: &str) -> Result<LoopOutcome, AgentError> {
        if text.trim().is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let _lease = self.sessions.lock(session_id).await?;
        self.event_bus.publish(DomainEvent::MessageReceived {
            session_id: session_id.to_string(),
            content_preview: text.trim().chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        let mut conversation = self.sessions.get_or_create(session_id).await?;
        conversation.push(Message::user(text));

        let result = self.agent.run(session_id, &mut conversation).await;
        if let Err(e) = &result {
            warn!(session = %session_id, error = %e, "Agent run failed");
        }

        self.sessions.save(session_id, conversation).await?;
        if let Ok(outcome) = &result {
            info!(session = %session_id, cycles = outcome.cycles, tool_calls = outcome.tool_calls, "Reply ready");
        }
        result
    }

    /// The stored transcript, if the session exists.
    pub async fn transcript(&self, session_id: &SessionId) -> Result<Option<Conversation>, SessionError> {
        self.sessions.get(session_id).await
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.agent.executor().registry()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn model(&self) -> &str {
        self.agent.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedProvider, call, text_reply, tool_reply};
    use calmate_calendar::InMemoryCalendar;
    use calmate_core::error::ProviderError;
    use calmate_core::message::Role;

    fn service(provider: Arc<ScriptedProvider>) -> ChatService {
        ChatService::from_parts(
            &AppConfig::default(),
            provider,
            Arc::new(InMemoryCalendar::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reply_and_history_are_kept_per_session() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            text_reply("Hi there!"),
            text_reply("You said hello before."),
        ]));
        let chat = service(provider.clone());
        let id = SessionId::new("u1");

        assert_eq!(chat.handle(&id, "hello").await.unwrap().reply, "Hi there!");
        chat.handle(&id, "what did I say?").await.unwrap();

        // The second request carries the first exchange.
        let second = &provider.requests()[1];
        let contents: Vec<_> = second.messages[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "Hi there!", "what did I say?"]);

        let transcript = chat.transcript(&id).await.unwrap().unwrap();
        assert_eq!(transcript.len(), 4);
    }

    #[tokio::test]
    async fn message_is_stored_verbatim() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("ok")]));
        let chat = service(provider.clone());
        let id = SessionId::new("u1");
        chat.handle(&id, "  lunch with Sam\n").await.unwrap();

        let transcript = chat.transcript(&id).await.unwrap().unwrap();
        assert_eq!(transcript.messages[0].content, "  lunch with Sam\n");
        assert_eq!(provider.requests()[0].messages[1].content, "  lunch with Sam\n");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_reply("a"), text_reply("b")]));
        let chat = service(provider.clone());
        chat.handle(&SessionId::new("u1"), "one").await.unwrap();
        chat.handle(&SessionId::new("u2"), "two").await.unwrap();

        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[1].content, "two");
    }

    #[tokio::test]
    async fn failed_run_still_saves_turns() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Timeout("slow".into())));
        let chat = service(provider);
        let id = SessionId::new("u1");

        let err = chat.handle(&id, "hello").await.unwrap_err();
        assert!(matches!(err, AgentError::ModelUnavailable(_)));
        let transcript = chat.transcript(&id).await.unwrap().unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let chat = service(Arc::new(ScriptedProvider::new(vec![])));
        assert!(matches!(
            chat.handle(&SessionId::new("u1"), "   ").await,
            Err(AgentError::EmptyMessage)
        ));
        assert!(matches!(
            chat.handle(&SessionId::new(""), "hi").await,
            Err(AgentError::Session(SessionError::EmptyId))
        ));
    }

    #[tokio::test]
    async fn tools_reach_the_calendar() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_reply(vec![call(
                "c1",
                "create_event",
                r#"{"summary":"Dentist","start":"2026-10-20T09:00:00-04:00"}"#,
            )]),
            text_reply("Booked."),
        ]));
        let calendar = Arc::new(InMemoryCalendar::new());
        let chat = ChatService::from_parts(&AppConfig::default(), provider, calendar.clone()).unwrap();

        let outcome = chat.handle(&SessionId::new("u1"), "dentist tomorrow 9am").await.unwrap();
        assert_eq!(outcome.reply, "Booked.");
        assert_eq!(outcome.tool_calls, 1);
        assert_eq!(calendar.len().await, 1);
        assert_eq!(chat.tools().len(), 6);
    }
}
