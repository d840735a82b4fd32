use std::fs;
use std::path::Path;

use minijinja::{Environment, context};
use thiserror::Error;

use crate::config::{Config, ConfigError};

#[derive(Debug, Error)]
#[error("failed to render prompt template: {0}")]
pub struct TemplateError(#[from] minijinja::Error);

/// The prompt bundle for one agent instance, loaded once at startup.
///
/// The query-builder and interpreter prompts are minijinja templates; the
/// others are plain text used verbatim as system messages.
#[derive(Debug, Clone)]
pub struct Prompts {
    /// Seeds every session's history as its first (and only) System message.
    pub global_system: String,
    /// Routing instruction for the intent classifier.
    pub router_system: String,
    /// Fixed instruction embedded in the query-builder template.
    pub query_builder_system: String,
    query_builder_template: String,
    sql_interpreter_template: String,
}

impl Prompts {
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            global_system: read_prompt(&config.global_system_prompt_path)?,
            router_system: read_prompt(&config.router_system_prompt_path)?,
            query_builder_system: read_prompt(&config.query_builder_system_prompt_path)?,
            query_builder_template: read_prompt(&config.query_builder_template_path)?,
            sql_interpreter_template: read_prompt(&config.sql_interpreter_template_path)?,
        })
    }

    /// Builds a prompt bundle from in-memory strings, bypassing the
    /// filesystem. Used by tests and embedders with their own prompt storage.
    pub fn from_parts(
        global_system: impl Into<String>,
        router_system: impl Into<String>,
        query_builder_system: impl Into<String>,
        query_builder_template: impl Into<String>,
        sql_interpreter_template: impl Into<String>,
    ) -> Self {
        Self {
            global_system: global_system.into(),
            router_system: router_system.into(),
            query_builder_system: query_builder_system.into(),
            query_builder_template: query_builder_template.into(),
            sql_interpreter_template: sql_interpreter_template.into(),
        }
    }

    /// Renders the query-generation prompt from the live schema description
    /// and the user's question.
    pub fn render_query_builder(
        &self,
        table_info: &str,
        user_input: &str,
    ) -> Result<String, TemplateError> {
        let rendered = Environment::new().render_str(
            &self.query_builder_template,
            context! {
                system_prompt => self.query_builder_system,
                table_info => table_info,
                user_input => user_input,
            },
        )?;
        Ok(rendered)
    }

    /// Renders the result-summarization prompt from the original question and
    /// the tabular result text.
    pub fn render_sql_interpreter(
        &self,
        question: &str,
        data: &str,
    ) -> Result<String, TemplateError> {
        let rendered = Environment::new().render_str(
            &self.sql_interpreter_template,
            context! {
                question => question,
                data => data,
            },
        )?;
        Ok(rendered)
    }
}

fn read_prompt(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::PromptFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_prompts() -> Prompts {
        Prompts::from_parts(
            "global",
            "router",
            "You write SQL.",
            "{{ system_prompt }}\n\nSchema:\n{{ table_info }}\n\nQuestion: {{ user_input }}",
            "Question: {{ question }}\nData:\n{{ data }}",
        )
    }

    #[test]
    fn query_builder_template_renders_all_fields() {
        let rendered = test_prompts()
            .render_query_builder("Table persons:\n  id (integer)", "how many persons?")
            .unwrap();
        assert!(rendered.starts_with("You write SQL."));
        assert!(rendered.contains("Table persons:"));
        assert!(rendered.contains("how many persons?"));
    }

    #[test]
    fn interpreter_template_renders_question_and_data() {
        let rendered = test_prompts()
            .render_sql_interpreter("how many?", "(42)")
            .unwrap();
        assert!(rendered.contains("how many?"));
        assert!(rendered.contains("(42)"));
    }
}
