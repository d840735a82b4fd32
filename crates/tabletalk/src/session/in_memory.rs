use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::{DEFAULT_SESSION_TTL_SECONDS, SessionStore, SessionStoreError};

const KEY_PREFIX: &str = "session:";

/// An in-memory implementation of the `SessionStore` trait.
///
/// Expiry is handled by the underlying cache: each save re-inserts the blob,
/// which restarts its time-to-live, mirroring a `SETEX`-style backend.
pub struct InMemorySessionStore {
    sessions: Cache<String, String>,
}

impl InMemorySessionStore {
    /// Creates a store whose sessions expire after `ttl` without a save.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder().time_to_live(ttl).build(),
        }
    }

    fn key(session_id: &str) -> String {
        format!("{KEY_PREFIX}{session_id}")
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<String>, SessionStoreError> {
        Ok(self.sessions.get(&Self::key(session_id)).await)
    }

    async fn save(&self, session_id: &str, blob: String) -> Result<(), SessionStoreError> {
        self.sessions.insert(Self::key(session_id), blob).await;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.sessions.invalidate(&Self::key(session_id)).await;
        Ok(())
    }
}
