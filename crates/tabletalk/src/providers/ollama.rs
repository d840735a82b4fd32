//! Ollama API client implementation of the `ChatProvider` capability.
//!
//! Talks to a local Ollama server over its `/api/chat` endpoint, in both
//! single-shot and NDJSON streaming modes.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::{ChatProvider, ChunkStream, Message};
use crate::error::LlmError;

/// Client for a single Ollama model endpoint.
///
/// The router, chat, and query-builder roles each get their own instance so
/// they can run different models at different temperatures.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    http: reqwest::Client,
    base_url: Url,
    model: String,
    temperature: Option<f32>,
}

/// Request payload for Ollama's chat API endpoint.
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Individual message in an Ollama chat conversation.
#[derive(Serialize)]
struct OllamaChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response frame from Ollama's chat endpoint; in streaming mode one frame
/// arrives per NDJSON line.
#[derive(Deserialize, Debug)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OllamaResponseMessage {
    content: String,
}

impl OllamaProvider {
    pub fn new(base_url: Url, model: impl Into<String>, temperature: Option<f32>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            model: model.into(),
            temperature,
        }
    }

    fn request_body<'a>(&'a self, messages: &'a [Message], stream: bool) -> OllamaChatRequest<'a> {
        let chat_messages = messages
            .iter()
            .map(|msg| OllamaChatMessage {
                role: match msg {
                    Message::System { .. } => "system",
                    Message::Human { .. } => "user",
                    Message::Ai { .. } => "assistant",
                    Message::Tool { .. } => "tool",
                },
                content: msg.content(),
            })
            .collect();

        OllamaChatRequest {
            model: &self.model,
            messages: chat_messages,
            stream,
            options: self.temperature.map(|temperature| OllamaOptions {
                temperature: Some(temperature),
            }),
        }
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response, LlmError> {
        let url = self.base_url.join("api/chat")?;
        let resp = self
            .http
            .post(url)
            .json(&self.request_body(messages, stream))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::ProviderError(format!(
                "Ollama returned {status}: {body}"
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let resp = self.send(messages, false).await?;
        let raw = resp.text().await?;
        let parsed: OllamaChatResponse =
            serde_json::from_str(&raw).map_err(|e| LlmError::ResponseFormatError {
                message: e.to_string(),
                raw_response: raw.clone(),
            })?;

        if let Some(error) = parsed.error {
            return Err(LlmError::ProviderError(error));
        }
        parsed
            .message
            .map(|m| m.content)
            .ok_or(LlmError::ResponseFormatError {
                message: "missing `message` in Ollama response".to_string(),
                raw_response: raw,
            })
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChunkStream, LlmError> {
        let resp = self.send(messages, true).await?;
        let mut bytes = resp.bytes_stream();

        let stream = try_stream! {
            let mut buf: Vec<u8> = Vec::new();
            let mut done = false;

            while !done {
                let Some(chunk) = bytes.next().await else {
                    break;
                };
                let chunk = chunk.map_err(LlmError::from)?;
                buf.extend_from_slice(&chunk);

                // One JSON frame per newline-terminated line.
                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = std::str::from_utf8(&line)
                        .map_err(|e| LlmError::ProviderError(e.to_string()))?
                        .trim();
                    if line.is_empty() {
                        continue;
                    }

                    let frame: OllamaChatResponse = serde_json::from_str(line)?;
                    if let Some(error) = frame.error {
                        Err(LlmError::ProviderError(error))?;
                    }
                    if let Some(message) = frame.message {
                        if !message.content.is_empty() {
                            yield message.content;
                        }
                    }
                    if frame.done {
                        done = true;
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_to_ollama_names() {
        let provider = OllamaProvider::new(
            Url::parse("http://localhost:11434").unwrap(),
            "llama3",
            Some(0.7),
        );
        let messages = vec![
            Message::system("sys"),
            Message::human("hi"),
            Message::ai("hello"),
            Message::tool("{}", "call_1"),
        ];

        let body = provider.request_body(&messages, true);
        let roles: Vec<&str> = body.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
        assert!(body.stream);
    }

    #[test]
    fn streaming_frame_parses() {
        let frame: OllamaChatResponse =
            serde_json::from_str(r#"{"message":{"content":"Hel"},"done":false}"#).unwrap();
        assert_eq!(frame.message.unwrap().content, "Hel");
        assert!(!frame.done);

        let last: OllamaChatResponse =
            serde_json::from_str(r#"{"message":{"content":""},"done":true,"done_reason":"stop"}"#)
                .unwrap();
        assert!(last.done);
    }
}
