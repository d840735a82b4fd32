use futures::stream;

use tabletalk::chat::ChunkStream;

/// The fixed response for out-of-domain input.
pub const REFUSAL_MESSAGE: &str = "I'm sorry, that question is outside my area of knowledge. \
     I can help you with general conversations. \
     Is there anything else I can assist you with?";

/// Handles out-of-domain turns with a fixed, non-generative response.
pub struct RefusalStrategy;

impl RefusalStrategy {
    /// Yields the refusal as a single chunk. No inputs, no failure modes.
    pub fn respond(&self) -> ChunkStream {
        Box::pin(stream::once(async { Ok(REFUSAL_MESSAGE.to_string()) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn yields_exactly_one_chunk() {
        let chunks: Vec<_> = RefusalStrategy.respond().collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), REFUSAL_MESSAGE);
    }
}
