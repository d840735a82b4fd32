use async_trait::async_trait;

/// An error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("codec error: {0}")]
    Codec(String),
}

/// Trait for abstracting durable, TTL-bounded session blob storage.
///
/// Keys are opaque session ids; values are the serialized history blob. The
/// store owns expiry: every save refreshes the session's time-to-live, and a
/// load after expiry behaves exactly like a load of a never-seen session.
/// Any concrete backend (Redis, a database table, an in-process cache) should
/// implement this trait.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Loads the blob for a session, or `None` if absent or expired.
    async fn load(&self, session_id: &str) -> Result<Option<String>, SessionStoreError>;

    /// Saves the blob for a session, replacing any previous value and
    /// refreshing the TTL.
    async fn save(&self, session_id: &str, blob: String) -> Result<(), SessionStoreError>;

    /// Removes a session outright.
    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError>;
}
