//! Session storage for CalMate.
//!
//! Conversations live in process memory keyed by session id. Each session
//! has its own async mutex, handed out as a `SessionLease`, so two
//! messages for the same session run one after the other while different
//! sessions never wait on each other.

pub mod window;

use async_trait::async_trait;
use calmate_core::error::SessionError;
use calmate_core::message::{Conversation, SessionId};
use calmate_core::session::{SessionLease, SessionStore};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

pub use window::trim_to_window;

struct Slot {
    conversation: Conversation,
    last_access: DateTime<Utc>,
    lock: Arc<Mutex<()>>,
}

impl Slot {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            conversation: Conversation::new(),
            last_access: now,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Nobody holds or waits for this session's lease.
    fn is_idle_lock(&self) -> bool {
        Arc::strong_count(&self.lock) == 1
    }
}

/// An in-process session store.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Slot>>,
    max_turns: usize,
    idle_ttl: Option<Duration>,
}

impl InMemorySessionStore {
    /// Unbounded history, no expiry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns: 0,
            idle_ttl: None,
        }
    }

    /// Keep at most `max_turns` turns per session (0 = unbounded).
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Evict sessions idle for longer than `ttl`.
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = Some(ttl);
        self
    }

    fn check(id: &SessionId) -> Result<(), SessionError> {
        if id.is_empty() {
            Err(SessionError::EmptyId)
        } else {
            Ok(())
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn lock(&self, id: &SessionId) -> Result<SessionLease, SessionError> {
        Self::check(id)?;
        let mutex = {
            let mut sessions = self.sessions.write().await;
            let slot = sessions
                .entry(id.clone())
                .or_insert_with(|| Slot::new(Utc::now()));
            slot.lock.clone()
        };
        Ok(mutex.lock_owned().await)
    }

    async fn get_or_create(&self, id: &SessionId) -> Result<Conversation, SessionError> {
        Self::check(id)?;
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let slot = sessions.entry(id.clone()).or_insert_with(|| {
            debug!(session = %id, "New session");
            Slot::new(now)
        });
        slot.last_access = now;
        Ok(slot.conversation.clone())
    }

    async fn save(&self, id: &SessionId, mut conversation: Conversation) -> Result<(), SessionError> {
        Self::check(id)?;
        let dropped = trim_to_window(&mut conversation, self.max_turns);
        if dropped > 0 {
            debug!(session = %id, dropped, "Trimmed session history");
        }

        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let slot = sessions.entry(id.clone()).or_insert_with(|| Slot::new(now));
        slot.conversation = conversation;
        slot.last_access = now;
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Conversation>, SessionError> {
        Self::check(id)?;
        Ok(self
            .sessions
            .read()
            .await
            .get(id)
            .map(|slot| slot.conversation.clone()))
    }

    async fn remove(&self, id: &SessionId) -> Result<bool, SessionError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn evict_idle(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let Some(ttl) = self.idle_ttl else {
            return Ok(0);
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| !slot.is_idle_lock() || now - slot.last_access <= ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        Ok(evicted)
    }

    async fn len(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.read().await.len())
    }
}
