//! tabletalk is the capability layer for a conversational backend that mixes
//! free-form chat with natural-language-to-SQL question answering.
//!
//! # Overview
//! This crate defines the message model persisted per session and the three
//! capabilities the agent layer orchestrates:
//!
//! - [`chat::ChatProvider`]: single-shot and streaming text completion
//! - [`session::SessionStore`]: durable, TTL-bounded session blobs
//! - [`db::Database`]: schema introspection and read-only query execution
//!
//! Concrete implementations (Ollama, an in-memory TTL store, Postgres) live in
//! their respective modules; the agent layer only ever sees the traits.

/// Chat message model and the completion capability trait.
pub mod chat;

/// Database capability: schema description and tabular query execution.
pub mod db;

/// Error types for completion providers.
pub mod error;

/// Completion provider implementations.
pub mod providers;

/// Durable session blob storage with TTL expiry.
pub mod session;

pub use chat::{ChatProvider, ChunkStream, Message};
pub use error::LlmError;
