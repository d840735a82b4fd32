use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;

/// A single message in a session's conversation history.
///
/// The serialized form is the durable session blob format: a `type` tag in
/// `{"system","human","ai","tool"}` plus a `content` string. AI messages may
/// carry opaque tool-call descriptors which round-trip verbatim; tool messages
/// carry the id of the tool call they answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    Human {
        content: String,
    },
    Ai {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<Value>>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// The text content, regardless of variant.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::Human { content }
            | Message::Ai { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    /// The wire-format tag for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::Human { .. } => "human",
            Message::Ai { .. } => "ai",
            Message::Tool { .. } => "tool",
        }
    }
}

/// Serializes a session history into the durable blob format.
pub fn serialize_history(messages: &[Message]) -> Result<String, serde_json::Error> {
    serde_json::to_string(messages)
}

/// Deserializes a session history from the durable blob format.
pub fn deserialize_history(blob: &str) -> Result<Vec<Message>, serde_json::Error> {
    serde_json::from_str(blob)
}

/// A lazily produced sequence of text fragments from a streaming completion.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Text completion capability over a chat-shaped message history.
///
/// Implementations wrap a concrete inference backend; callers hold
/// `Arc<dyn ChatProvider>` and never see backend specifics.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Single-shot generation: the full response text in one call.
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// Incremental generation: text fragments as the backend produces them.
    async fn chat_stream(&self, messages: &[Message]) -> Result<ChunkStream, LlmError>;
}
