use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{error, info, warn};

use tabletalk::chat::{ChatProvider, Message, deserialize_history, serialize_history};
use tabletalk::db::Database;
use tabletalk::session::SessionStore;

use crate::prompts::Prompts;
use crate::router::{IntentRouter, Route};
use crate::strategy::{ChatStrategy, RefusalStrategy, SqlStrategy};

/// The session id used when the caller does not supply one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Coordinates one conversational turn end to end.
///
/// Per turn: check the session history out of the store (seeding it on first
/// access), classify the input, dispatch to the matching strategy, stream its
/// chunks to the caller while accumulating the full text, append the turn's
/// Human/AI pair, and check the history back in as the final step. The
/// returned stream never yields an error: every failure surfaces as ordinary
/// text in the same channel as normal output.
///
/// Concurrent turns on the same session id race on the load/save window and
/// resolve last-writer-wins; there is no per-session locking. If the caller
/// drops the stream mid-turn, no save is issued for that turn.
#[derive(Clone)]
pub struct Agent {
    router: Arc<IntentRouter>,
    chat: Arc<ChatStrategy>,
    sql: Arc<SqlStrategy>,
    store: Arc<dyn SessionStore>,
    global_system_prompt: String,
}

impl Agent {
    /// Wires an agent from its injected capabilities. Built once at startup
    /// and cloned (cheaply) into request handlers.
    pub fn new(
        router_provider: Arc<dyn ChatProvider>,
        chat_provider: Arc<dyn ChatProvider>,
        query_builder_provider: Arc<dyn ChatProvider>,
        database: Arc<dyn Database>,
        store: Arc<dyn SessionStore>,
        prompts: Prompts,
    ) -> Self {
        let router = IntentRouter::new(router_provider, prompts.router_system.clone());
        let chat = ChatStrategy::new(chat_provider.clone());
        // The interpreter reuses the chat model: summaries are conversational.
        let sql = SqlStrategy::new(
            query_builder_provider,
            chat_provider,
            database,
            prompts.clone(),
        );

        Self {
            router: Arc::new(router),
            chat: Arc::new(chat),
            sql: Arc::new(sql),
            store,
            global_system_prompt: prompts.global_system,
        }
    }

    /// Processes one user turn, yielding response text chunks.
    ///
    /// The stream is finite and not restartable. It is total: strategy and
    /// store failures become yielded text, never stream errors.
    pub fn process_turn(
        &self,
        user_input: String,
        session_id: String,
    ) -> impl Stream<Item = String> + Send + use<> {
        let agent = self.clone();

        stream! {
            let mut history = agent.load_or_seed(&session_id).await;
            let route = agent.router.route(&user_input).await;
            history.push(Message::human(&user_input));

            let mut full_response = String::new();

            match route {
                Route::Offside => {
                    let mut chunks = RefusalStrategy.respond();
                    while let Some(chunk) = chunks.next().await {
                        if let Ok(text) = chunk {
                            full_response.push_str(&text);
                            yield text;
                        }
                    }
                }

                Route::Chat => {
                    match agent.chat.stream(&history).await {
                        Ok(mut chunks) => {
                            let mut failure = None;
                            while let Some(chunk) = chunks.next().await {
                                match chunk {
                                    Ok(text) => {
                                        full_response.push_str(&text);
                                        yield text;
                                    }
                                    Err(e) => {
                                        failure = Some(e);
                                        break;
                                    }
                                }
                            }
                            if let Some(e) = failure {
                                error!(error = %e, "chat streaming failed mid-turn");
                                let text = chat_error_text(&e);
                                full_response = text.clone();
                                yield text;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "chat streaming failed to start");
                            let text = chat_error_text(&e);
                            full_response = text.clone();
                            yield text;
                        }
                    }
                }

                Route::Sql => {
                    match agent.sql.stream(&user_input, &history[0]).await {
                        Ok(mut chunks) => {
                            let mut failure = None;
                            while let Some(chunk) = chunks.next().await {
                                match chunk {
                                    Ok(text) => {
                                        full_response.push_str(&text);
                                        yield text;
                                    }
                                    Err(e) => {
                                        failure = Some(e);
                                        break;
                                    }
                                }
                            }
                            if let Some(e) = failure {
                                error!(error = %e, "SQL interpretation failed mid-stream");
                                let text = sql_error_text(&e);
                                full_response = text.clone();
                                yield text;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "SQL pipeline failed");
                            let text = sql_error_text(&e);
                            full_response = text.clone();
                            yield text;
                        }
                    }
                }
            }

            // The turn's full text, success or failure, becomes the AI
            // message; the save is unconditional so the durable record always
            // holds a complete Human/AI pair.
            history.push(Message::ai(full_response));
            agent.persist(&session_id, &history).await;

            info!(session_id = %session_id, %route, "turn complete");
        }
    }

    /// Returns the full history for a session, seeding it on first access.
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.load_or_seed(session_id).await
    }

    /// Resets a session to just its System message.
    pub async fn clear_history(&self, session_id: &str) {
        let history = vec![Message::system(self.global_system_prompt.clone())];
        self.persist(session_id, &history).await;
        info!(session_id = %session_id, "history cleared");
    }

    async fn load_or_seed(&self, session_id: &str) -> Vec<Message> {
        match self.store.load(session_id).await {
            Ok(Some(blob)) => match deserialize_history(&blob) {
                Ok(history) if !history.is_empty() => history,
                Ok(_) => {
                    warn!(session_id = %session_id, "stored history was empty, reseeding");
                    self.seed(session_id).await
                }
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "stored history is corrupt, starting fresh");
                    vec![Message::system(self.global_system_prompt.clone())]
                }
            },
            Ok(None) => self.seed(session_id).await,
            Err(e) => {
                // Degraded mode: prior turns are lost but the request proceeds.
                error!(session_id = %session_id, error = %e, "failed to load session, starting fresh");
                vec![Message::system(self.global_system_prompt.clone())]
            }
        }
    }

    /// Creates and immediately persists a fresh System-only history.
    async fn seed(&self, session_id: &str) -> Vec<Message> {
        let history = vec![Message::system(self.global_system_prompt.clone())];
        self.persist(session_id, &history).await;
        history
    }

    /// Saves the history; failures are logged and do not affect the response
    /// already streamed to the caller.
    async fn persist(&self, session_id: &str, history: &[Message]) {
        match serialize_history(history) {
            Ok(blob) => {
                if let Err(e) = self.store.save(session_id, blob).await {
                    error!(session_id = %session_id, error = %e, "failed to save session");
                }
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "failed to serialize session history");
            }
        }
    }
}

fn chat_error_text(e: &impl std::fmt::Display) -> String {
    format!("Sorry, there was an error while processing your message: {e}")
}

fn sql_error_text(e: &impl std::fmt::Display) -> String {
    format!("Sorry, there was an error while answering your question from the database: {e}")
}
