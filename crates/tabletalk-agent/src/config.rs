use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use tabletalk::session::DEFAULT_SESSION_TTL_SECONDS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(String),
    #[error("environment variable {0} must not be empty")]
    Empty(String),
    #[error("environment variable {var} is not a valid number: {value}")]
    InvalidNumber { var: String, value: String },
    #[error("environment variable {var} is not a valid URL: {value}")]
    InvalidUrl { var: String, value: String },
    #[error("failed to read prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Runtime configuration, read from the environment.
///
/// The router, chat, and query-builder roles are separately configurable so
/// that classification and SQL generation can run deterministic models while
/// chat stays creative.
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_base_url: Url,

    pub router_model: String,
    pub router_temperature: f32,
    pub chat_model: String,
    pub chat_temperature: f32,
    pub query_builder_model: String,
    pub query_builder_temperature: f32,

    pub database_url: String,
    pub session_ttl: Duration,

    pub global_system_prompt_path: PathBuf,
    pub router_system_prompt_path: PathBuf,
    pub query_builder_system_prompt_path: PathBuf,
    pub query_builder_template_path: PathBuf,
    pub sql_interpreter_template_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let ollama_base_url = required("OLLAMA_BASE_URL")?;
        let ollama_base_url =
            Url::parse(&ollama_base_url).map_err(|_| ConfigError::InvalidUrl {
                var: "OLLAMA_BASE_URL".to_string(),
                value: ollama_base_url,
            })?;

        Ok(Self {
            ollama_base_url,
            router_model: required("ROUTER_LLM_MODEL_NAME")?,
            router_temperature: temperature("ROUTER_TEMPERATURE", 0.0)?,
            chat_model: required("CHAT_LLM_MODEL_NAME")?,
            chat_temperature: temperature("CHAT_TEMPERATURE", 0.7)?,
            query_builder_model: required("QUERY_BUILDER_LLM_MODEL_NAME")?,
            query_builder_temperature: temperature("QUERY_BUILDER_TEMPERATURE", 0.0)?,
            database_url: required("DATABASE_URL")?,
            session_ttl: Duration::from_secs(
                optional_u64("SESSION_TTL_SECONDS")?.unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            ),
            global_system_prompt_path: required("GLOBAL_SYSTEM_PROMPT_PATH")?.into(),
            router_system_prompt_path: required("ROUTER_SYSTEM_PROMPT_PATH")?.into(),
            query_builder_system_prompt_path: required("QUERY_BUILDER_SYSTEM_PROMPT_PATH")?.into(),
            query_builder_template_path: required("QUERY_BUILDER_PROMPT_TEMPLATE_PATH")?.into(),
            sql_interpreter_template_path: required("SQL_INTERPRETER_PROMPT_TEMPLATE_PATH")?.into(),
        })
    }
}

fn required(var: &str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::Empty(var.to_string())),
        Ok(value) => Ok(value),
        Err(_) => Err(ConfigError::Missing(var.to_string())),
    }
}

fn temperature(var: &str, default: f32) -> Result<f32, ConfigError> {
    match env::var(var) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            var: var.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

fn optional_u64(var: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}
