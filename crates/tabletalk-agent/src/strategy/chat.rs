use std::sync::Arc;

use tabletalk::chat::{ChatProvider, ChunkStream, Message};
use tabletalk::error::LlmError;

/// Free-form conversation over the full session history.
///
/// The strategy itself is a thin seam over the completion capability; the
/// coordinator appends the Human message before calling `stream` and appends
/// the accumulated AI message after draining it.
pub struct ChatStrategy {
    provider: Arc<dyn ChatProvider>,
}

impl ChatStrategy {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Streams a generative response over `history`, which must already end
    /// with the current turn's Human message.
    pub async fn stream(&self, history: &[Message]) -> Result<ChunkStream, LlmError> {
        self.provider.chat_stream(history).await
    }
}
