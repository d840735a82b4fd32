use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row};
use tracing::debug;

use super::{Database, DatabaseError};

/// A Postgres implementation of the `Database` trait backed by a sqlx pool.
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Connects to the database and verifies the connection.
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| DatabaseError::Connect(e.to_string()))?;

        debug!("database connection pool established");
        Ok(Self { pool })
    }

    /// Wraps an existing pool, for callers that manage their own connection.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn describe_schema(&self) -> Result<String, DatabaseError> {
        let rows = sqlx::query(
            "SELECT table_name, column_name, data_type
             FROM information_schema.columns
             WHERE table_schema = 'public'
             ORDER BY table_name, ordinal_position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::Schema(e.to_string()))?;

        let mut out = String::new();
        let mut current_table = String::new();
        for row in rows {
            let table: String = row
                .try_get("table_name")
                .map_err(|e| DatabaseError::Schema(e.to_string()))?;
            let column: String = row
                .try_get("column_name")
                .map_err(|e| DatabaseError::Schema(e.to_string()))?;
            let data_type: String = row
                .try_get("data_type")
                .map_err(|e| DatabaseError::Schema(e.to_string()))?;

            if table != current_table {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("Table {table}:\n"));
                current_table = table;
            }
            out.push_str(&format!("  {column} ({data_type})\n"));
        }

        Ok(out)
    }

    async fn run(&self, sql: &str) -> Result<String, DatabaseError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        debug!(rows = rows.len(), "query executed");

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let values: Vec<String> = (0..row.columns().len())
                .map(|idx| render_value(row, idx))
                .collect();
            lines.push(format!("({})", values.join(", ")));
        }
        Ok(lines.join("\n"))
    }
}

/// Renders a single column value as text, trying the common Postgres types in
/// turn. Unknown types render as `?` rather than failing the whole row.
fn render_value(row: &PgRow, idx: usize) -> String {
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.unwrap_or_else(|| "NULL".to_string());
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |b| b.to_string());
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |t| t.to_rfc3339());
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |t| t.to_string());
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |d| d.to_string());
    }
    if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |u| u.to_string());
    }
    if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(idx) {
        return v.map_or_else(|| "NULL".to_string(), |j| j.to_string());
    }
    "?".to_string()
}
