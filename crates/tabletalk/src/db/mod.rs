mod postgres;

pub use postgres::PostgresDatabase;

use async_trait::async_trait;

/// An error type for database capability operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("failed to connect to database: {0}")]
    Connect(String),
    #[error("schema introspection failed: {0}")]
    Schema(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Read-side database capability consumed by the SQL answering pipeline.
///
/// The pipeline never sees connection details; it asks for a textual schema
/// description to ground query generation, and for a textual rendering of a
/// query's result rows.
#[async_trait]
pub trait Database: Send + Sync {
    /// Describes the tables and columns visible to generated queries, as text
    /// suitable for embedding into a prompt. Introspected live, never cached.
    async fn describe_schema(&self) -> Result<String, DatabaseError>;

    /// Runs a query and renders its result rows as text, one row per line.
    /// An empty result renders as the empty string.
    async fn run(&self, sql: &str) -> Result<String, DatabaseError>;
}
