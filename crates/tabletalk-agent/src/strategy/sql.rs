use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use tabletalk::chat::{ChatProvider, ChunkStream, Message};
use tabletalk::db::Database;

use crate::prompts::Prompts;

/// Literal fed to the interpreter when the executed query returned no rows.
pub const NO_DATA_SENTINEL: &str = "No data available.";

/// A failure at one of the pipeline's stage boundaries. Mid-stream failures
/// during interpretation are handled by the coordinator's drain loop instead.
#[derive(Debug, Error)]
pub enum SqlPipelineError {
    #[error("failed to build SQL query: {0}")]
    Build(String),
    #[error("failed to execute SQL query: {0}")]
    Execute(String),
    #[error("failed to start result interpretation: {0}")]
    Interpret(String),
}

/// Natural-language question answering over the database: a three-stage
/// pipeline (build query, execute it, interpret the results) with no
/// backtracking. The SQL text and raw result rows are transient; only the
/// interpreter's natural-language summary becomes part of the conversation.
pub struct SqlStrategy {
    builder: Arc<dyn ChatProvider>,
    interpreter: Arc<dyn ChatProvider>,
    database: Arc<dyn Database>,
    prompts: Prompts,
}

impl SqlStrategy {
    pub fn new(
        builder: Arc<dyn ChatProvider>,
        interpreter: Arc<dyn ChatProvider>,
        database: Arc<dyn Database>,
        prompts: Prompts,
    ) -> Self {
        Self {
            builder,
            interpreter,
            database,
            prompts,
        }
    }

    /// Runs build and execute, then returns the interpreter's chunk stream.
    /// `system` is the session's existing System message, reused (not
    /// duplicated) to seed the summarization exchange.
    pub async fn stream(
        &self,
        user_input: &str,
        system: &Message,
    ) -> Result<ChunkStream, SqlPipelineError> {
        let query = self.build_query(user_input).await?;
        let results = self.execute_query(&query).await?;

        let data = if results.trim().is_empty() {
            NO_DATA_SENTINEL.to_string()
        } else {
            results
        };

        let context = self
            .prompts
            .render_sql_interpreter(user_input, &data)
            .map_err(|e| SqlPipelineError::Interpret(e.to_string()))?;

        let messages = [system.clone(), Message::human(context)];
        self.interpreter
            .chat_stream(&messages)
            .await
            .map_err(|e| SqlPipelineError::Interpret(e.to_string()))
    }

    /// Build stage: live schema introspection + templated prompt + one
    /// non-streaming completion, with code fences stripped from the output.
    async fn build_query(&self, user_input: &str) -> Result<String, SqlPipelineError> {
        let table_info = self
            .database
            .describe_schema()
            .await
            .map_err(|e| SqlPipelineError::Build(e.to_string()))?;

        let prompt = self
            .prompts
            .render_query_builder(&table_info, user_input)
            .map_err(|e| SqlPipelineError::Build(e.to_string()))?;

        let response = self
            .builder
            .chat(&[Message::system(prompt)])
            .await
            .map_err(|e| SqlPipelineError::Build(e.to_string()))?;

        debug!(raw = %response, "query builder raw response");

        let query = strip_code_fences(&response);
        if query.is_empty() {
            error!("query builder produced an empty response");
            return Err(SqlPipelineError::Build(
                "the model produced no SQL query".to_string(),
            ));
        }

        info!(query = %query, "built SQL query");
        Ok(query)
    }

    /// Execute stage: re-validates non-emptiness, gates on read-only
    /// statements, and wraps execution failures with their original message.
    async fn execute_query(&self, query: &str) -> Result<String, SqlPipelineError> {
        if query.trim().is_empty() {
            error!("refusing to execute an empty SQL query");
            return Err(SqlPipelineError::Execute(
                "cannot execute an empty SQL query".to_string(),
            ));
        }

        if !is_read_only(query) {
            error!(query = %query, "rejected non-read-only statement");
            return Err(SqlPipelineError::Execute(
                "only read-only SELECT statements are allowed".to_string(),
            ));
        }

        info!(query = %query, "executing SQL query");
        self.database
            .run(query)
            .await
            .map_err(|e| SqlPipelineError::Execute(e.to_string()))
    }
}

/// Strips Markdown code-fence markers (```sql ... ``` or bare ``` ... ```)
/// from a model response.
fn strip_code_fences(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.starts_with("```sql") {
        trimmed.replace("```sql", "").replace("```", "").trim().to_string()
    } else if trimmed.starts_with("```") {
        trimmed.replace("```", "").trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Statement-type allowlist for generated queries: only plain reads.
fn is_read_only(query: &str) -> bool {
    matches!(
        query.trim().split_whitespace().next().map(str::to_uppercase).as_deref(),
        Some("SELECT") | Some("WITH")
    )
}
