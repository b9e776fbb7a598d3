//! SessionStore trait: maps session ids to their conversations.
//!
//! A store hands out a per-session lease. Holding the lease is what makes
//! a load → run → save sequence atomic for one session; different
//! sessions never contend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::error::SessionError;
use crate::message::{Conversation, SessionId};

/// Exclusive access to one session until dropped.
pub type SessionLease = OwnedMutexGuard<()>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    fn name(&self) -> &str;

    /// Wait for exclusive access to `id`.
    async fn lock(&self, id: &SessionId) -> Result<SessionLease, SessionError>;

    /// The session's conversation, created empty on first access.
    async fn get_or_create(&self, id: &SessionId) -> Result<Conversation, SessionError>;

    /// Store the conversation for `id`, replacing the previous one.
    async fn save(&self, id: &SessionId, conversation: Conversation) -> Result<(), SessionError>;

    /// Read a session without creating it.
    async fn get(&self, id: &SessionId) -> Result<Option<Conversation>, SessionError>;

    async fn remove(&self, id: &SessionId) -> Result<bool, SessionError>;

    /// Drop sessions idle since before the store's TTL, relative to `now`.
    /// Returns how many were removed.
    async fn evict_idle(&self, now: DateTime<Utc>) -> Result<usize, SessionError>;

    async fn len(&self) -> Result<usize, SessionError>;
}
