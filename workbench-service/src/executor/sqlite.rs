//! Live SQL executor over a SQLite pool.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool};

use common::models::{ExecutionError, SqlQuery};

use super::{ExecutorError, SqlExecutor, SqlOutcome};

/// Statements answered with a row set.
const ROW_PREFIXES: [&str; 5] = ["select", "with", "pragma", "explain", "values"];

pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn returns_rows(sql: &str) -> bool {
        let lowered = sql.trim_start().to_lowercase();
        ROW_PREFIXES.iter().any(|p| lowered.starts_with(p)) || lowered.contains(" returning ")
    }

    /// Converts a row to a JSON object keyed by column name.
    fn row_to_json(row: &SqliteRow) -> Value {
        let mut object = Map::with_capacity(row.columns().len());
        for (i, column) in row.columns().iter().enumerate() {
            object.insert(column.name().to_string(), Self::cell(row, i));
        }
        Value::Object(object)
    }

    fn cell(row: &SqliteRow, i: usize) -> Value {
        if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            return v.map_or(Value::Null, Value::from);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
            return v.map_or(Value::Null, Value::from);
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            return v.map_or(Value::Null, Value::from);
        }
        match row.try_get::<Option<Vec<u8>>, _>(i) {
            Ok(Some(bytes)) => Value::from(bytes),
            _ => Value::Null,
        }
    }

    /// Errors reported by the database itself are part of the outcome.
    fn reported(err: sqlx::Error) -> Result<SqlOutcome, ExecutorError> {
        match err {
            sqlx::Error::Database(db) => Ok(SqlOutcome {
                error: Some(
                    ExecutionError::new(db.message().to_string())
                        .with_code(db.code().map_or_else(|| "SQL_ERROR".to_string(), |c| c.into_owned())),
                ),
                ..Default::default()
            }),
            other => Err(ExecutorError::Database(other.to_string())),
        }
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn run(&self, query: &SqlQuery) -> Result<SqlOutcome, ExecutorError> {
        let sql = query.query.trim();
        if sql.is_empty() {
            return Err(ExecutorError::InvalidRequest("Query cannot be empty".into()));
        }
        let start = std::time::Instant::now();

        let outcome = if Self::returns_rows(sql) {
            match sqlx::query(sql).fetch_all(&self.pool).await {
                Ok(rows) => {
                    let data: Vec<Value> = rows.iter().map(Self::row_to_json).collect();
                    SqlOutcome {
                        row_count: Some(data.len() as u64),
                        data: Some(Value::Array(data)),
                        ..Default::default()
                    }
                }
                Err(e) => return Self::reported(e),
            }
        } else {
            match sqlx::query(sql).execute(&self.pool).await {
                Ok(done) => SqlOutcome {
                    row_count: Some(done.rows_affected()),
                    data: Some(json!({
                        "message": format!("{} row(s) affected", done.rows_affected()),
                        "affectedRows": done.rows_affected(),
                    })),
                    ..Default::default()
                },
                Err(e) => return Self::reported(e),
            }
        };

        Ok(SqlOutcome {
            execution_time: Some(start.elapsed().as_millis() as u64),
            ..outcome
        })
    }
}
