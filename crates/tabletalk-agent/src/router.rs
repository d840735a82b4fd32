use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use tabletalk::chat::{ChatProvider, Message};

/// The classified intent of a user turn, determining which strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Out of domain; answered with a fixed refusal.
    Offside,
    /// General conversation.
    Chat,
    /// A question answerable from the database.
    Sql,
}

impl Route {
    /// Parses a normalized classifier label. Anything that is not exactly one
    /// of the three labels is `None`; the caller decides the fallback.
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "offside" => Some(Route::Offside),
            "chat" => Some(Route::Chat),
            "sql" => Some(Route::Sql),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Offside => write!(f, "offside"),
            Route::Chat => write!(f, "chat"),
            Route::Sql => write!(f, "sql"),
        }
    }
}

/// Classifies a single user utterance into a [`Route`].
///
/// The router is stateless and sees only the current utterance, never the
/// conversation history. It is internally total: classifier failures and
/// unrecognized labels both fall open to [`Route::Chat`], so a degraded
/// classifier degrades to general conversation rather than to silence.
pub struct IntentRouter {
    provider: Arc<dyn ChatProvider>,
    system_prompt: String,
}

impl IntentRouter {
    pub fn new(provider: Arc<dyn ChatProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
        }
    }

    pub async fn route(&self, user_input: &str) -> Route {
        let messages = [
            Message::system(self.system_prompt.clone()),
            Message::human(user_input),
        ];

        match self.provider.chat(&messages).await {
            Ok(response) => {
                let label = normalize_label(&response);
                match Route::from_label(&label) {
                    Some(route) => {
                        info!(%route, "router determined route");
                        route
                    }
                    None => {
                        warn!(label = %label, "router returned unexpected label, defaulting to chat");
                        Route::Chat
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "router classification failed, defaulting to chat");
                Route::Chat
            }
        }
    }
}

/// Trims whitespace and surrounding quote characters, then lowercases.
fn normalize_label(response: &str) -> String {
    response
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mocks::MockProvider;
    use tabletalk::LlmError;

    fn router_with_response(result: Result<String, LlmError>) -> IntentRouter {
        let mut provider = MockProvider::new();
        provider.expect_chat().return_once(move |_| result);
        IntentRouter::new(Arc::new(provider), "classify")
    }

    #[tokio::test]
    async fn recognized_labels_map_to_routes() {
        for (label, expected) in [
            ("offside", Route::Offside),
            ("chat", Route::Chat),
            ("sql", Route::Sql),
        ] {
            let router = router_with_response(Ok(label.to_string()));
            assert_eq!(router.route("anything").await, expected);
        }
    }

    #[tokio::test]
    async fn labels_are_normalized_before_matching() {
        for raw in ["  SQL \n", "\"sql\"", "'sql'", "\" Sql \""] {
            let router = router_with_response(Ok(raw.to_string()));
            assert_eq!(router.route("anything").await, Route::Sql, "raw: {raw:?}");
        }
    }

    #[tokio::test]
    async fn unrecognized_label_defaults_to_chat() {
        let router = router_with_response(Ok("banana".to_string()));
        assert_eq!(router.route("anything").await, Route::Chat);
    }

    #[tokio::test]
    async fn classifier_failure_defaults_to_chat() {
        let router =
            router_with_response(Err(LlmError::ProviderError("connection refused".into())));
        assert_eq!(router.route("anything").await, Route::Chat);
    }

    #[tokio::test]
    async fn router_sends_system_and_human_messages() {
        let mut provider = MockProvider::new();
        provider
            .expect_chat()
            .withf(|messages: &[Message]| {
                messages.len() == 2
                    && messages[0] == Message::system("classify")
                    && messages[1] == Message::human("what's up")
            })
            .return_once(|_| Ok("chat".to_string()));

        let router = IntentRouter::new(Arc::new(provider), "classify");
        assert_eq!(router.route("what's up").await, Route::Chat);
    }
}
