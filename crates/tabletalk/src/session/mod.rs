mod in_memory;
mod store;

pub use in_memory::InMemorySessionStore;
pub use store::{SessionStore, SessionStoreError};

/// Session lifetime applied when the caller does not configure one: 24 hours
/// of inactivity, refreshed on every save.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 86_400;
