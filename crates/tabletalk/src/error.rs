use thiserror::Error;

/// Error types that can occur when talking to a completion provider.
#[derive(Error, Debug)]
pub enum LlmError {
    /// A wrapper for provider-specific error messages.
    #[error("provider error: {0}")]
    ProviderError(String),

    /// Errors related to malformed requests.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Errors related to malformed response bodies.
    #[error("response format error: {message}. Raw response: '{raw_response}'")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },

    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Handles JSON serialization and deserialization errors.
    #[error("JSON error")]
    JsonError(#[from] serde_json::Error),

    /// Handles errors from parsing URLs.
    #[error("invalid URL")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::HttpError(err.to_string())
    }
}
