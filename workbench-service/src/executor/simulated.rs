//! Canned executors for demos and tests.
//!
//! Responses depend only on the request text: URLs or queries containing
//! trigger words produce error outcomes, a few well-known resources return
//! fixed data sets.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use common::models::{ExecutionError, HttpMethod, RestRequest, SqlQuery};
use common::utils::IdGenerator;

use super::{ExecutorError, RestExecutor, RestOutcome, SqlExecutor, SqlOutcome};

const DDL_PREFIXES: [&str; 3] = ["create", "drop", "alter"];

fn json_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("content-type".to_string(), "application/json".to_string())])
}

async fn pause(latency: Option<Duration>) {
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedRestExecutor {
    latency: Option<Duration>,
}

impl SimulatedRestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
        }
    }

    fn respond(request: &RestRequest) -> RestOutcome {
        let url = request.url.to_lowercase();

        if url.trim().is_empty() {
            return RestOutcome {
                error: Some(
                    ExecutionError::new("URL and method are required").with_code("VALIDATION_ERROR"),
                ),
                ..Default::default()
            };
        }

        if url.contains("error") || url.contains("fail") {
            let mut headers = json_headers();
            headers.insert("x-error".into(), "simulated-error".into());
            return RestOutcome {
                status: Some(500),
                status_text: Some("Internal Server Error".into()),
                headers,
                data: None,
                error: Some(
                    ExecutionError::new("Simulated server error")
                        .with_code(500)
                        .with_details(json!({ "timestamp": Utc::now().to_rfc3339() })),
                ),
            };
        }

        if url.contains("notfound") || url.contains("missing") {
            return RestOutcome {
                status: Some(404),
                status_text: Some("Not Found".into()),
                headers: json_headers(),
                data: None,
                error: Some(ExecutionError::new("Resource not found").with_code(404)),
            };
        }

        let body = request.body.as_deref().filter(|b| !b.is_empty()).map(|b| {
            serde_json::from_str::<Value>(b).unwrap_or_else(|_| Value::String(b.to_string()))
        });

        let (status, status_text, data) = match request.method {
            HttpMethod::Get if url.contains("users") => (
                200,
                "OK",
                json!({
                    "users": [
                        { "id": 1, "name": "John Doe", "email": "john@example.com" },
                        { "id": 2, "name": "Jane Smith", "email": "jane@example.com" }
                    ],
                    "total": 2,
                    "page": 1
                }),
            ),
            HttpMethod::Get if url.contains("products") => (
                200,
                "OK",
                json!({
                    "products": [
                        { "id": 1, "name": "Widget A", "price": 29.99, "category": "tools" },
                        { "id": 2, "name": "Widget B", "price": 39.99, "category": "tools" },
                        { "id": 3, "name": "Gadget C", "price": 49.99, "category": "electronics" }
                    ],
                    "total": 3
                }),
            ),
            HttpMethod::Get => (
                200,
                "OK",
                json!({
                    "message": "Success",
                    "timestamp": Utc::now().to_rfc3339(),
                    "data": { "result": "GET request executed successfully" }
                }),
            ),
            HttpMethod::Post => (
                201,
                "Created",
                json!({
                    "message": "Resource created successfully",
                    "id": 1,
                    "created": Utc::now().to_rfc3339(),
                    "data": body
                }),
            ),
            HttpMethod::Put => (
                200,
                "OK",
                json!({
                    "message": "Resource updated successfully",
                    "id": 1,
                    "updated": Utc::now().to_rfc3339(),
                    "data": body
                }),
            ),
            HttpMethod::Delete => (204, "No Content", Value::Null),
            other => (
                200,
                "OK",
                json!({
                    "message": format!("{} request executed", other),
                    "timestamp": Utc::now().to_rfc3339()
                }),
            ),
        };

        let mut headers = json_headers();
        headers.insert("x-request-id".into(), IdGenerator::request_id());
        RestOutcome {
            status: Some(status),
            status_text: Some(status_text.to_string()),
            headers,
            data: Some(data),
            error: None,
        }
    }
}

#[async_trait]
impl RestExecutor for SimulatedRestExecutor {
    async fn run(&self, request: &RestRequest) -> Result<RestOutcome, ExecutorError> {
        pause(self.latency).await;
        Ok(Self::respond(request))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedSqlExecutor {
    latency: Option<Duration>,
}

impl SimulatedSqlExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
        }
    }

    fn respond(query: &SqlQuery) -> SqlOutcome {
        let sql = query.query.trim().to_lowercase();

        if sql.is_empty() {
            return SqlOutcome {
                error: Some(ExecutionError::new("Query cannot be empty").with_code("EMPTY_QUERY")),
                ..Default::default()
            };
        }

        if let Some(column) = sql.find("syntax_error").or_else(|| sql.find("invalid")) {
            return SqlOutcome {
                error: Some(
                    ExecutionError::new("Syntax error in SQL query")
                        .with_code("SQL_SYNTAX_ERROR")
                        .with_details(json!({ "line": 1, "column": column })),
                ),
                ..Default::default()
            };
        }

        let (data, row_count) = if sql.starts_with("select") {
            Self::select(&sql)
        } else if sql.starts_with("insert") {
            (json!({ "message": "Inserted 1 row(s)", "insertId": 1 }), 1)
        } else if sql.starts_with("update") {
            (json!({ "message": "Updated 1 row(s)", "affectedRows": 1 }), 1)
        } else if sql.starts_with("delete") {
            (json!({ "message": "Deleted 1 row(s)", "affectedRows": 1 }), 1)
        } else if DDL_PREFIXES.iter().any(|p| sql.starts_with(p)) {
            let operation = sql.split_whitespace().next().unwrap_or_default().to_uppercase();
            (
                json!({ "message": "DDL operation completed successfully", "operation": operation }),
                0,
            )
        } else {
            (
                json!({ "message": "Query executed successfully", "result": "Generic result data" }),
                1,
            )
        };

        SqlOutcome {
            data: Some(data),
            row_count: Some(row_count),
            execution_time: None,
            error: None,
        }
    }

    fn select(sql: &str) -> (Value, u64) {
        let rows = if sql.contains("users") {
            json!([
                { "id": 1, "name": "John Doe", "email": "john@example.com", "created_at": "2024-01-15T10:30:00Z" },
                { "id": 2, "name": "Jane Smith", "email": "jane@example.com", "created_at": "2024-01-16T11:45:00Z" },
                { "id": 3, "name": "Bob Johnson", "email": "bob@example.com", "created_at": "2024-01-17T09:20:00Z" }
            ])
        } else if sql.contains("products") {
            json!([
                { "id": 1, "name": "Widget A", "price": 29.99, "category": "tools", "stock": 150 },
                { "id": 2, "name": "Widget B", "price": 39.99, "category": "tools", "stock": 89 },
                { "id": 3, "name": "Gadget C", "price": 49.99, "category": "electronics", "stock": 45 }
            ])
        } else if sql.contains("count") {
            json!([{ "count": 3 }])
        } else {
            let now = Utc::now().to_rfc3339();
            json!([
                { "id": 1, "value": "Sample data A", "timestamp": now },
                { "id": 2, "value": "Sample data B", "timestamp": now }
            ])
        };
        let count = rows.as_array().map_or(0, |r| r.len() as u64);
        (rows, count)
    }
}

#[async_trait]
impl SqlExecutor for SimulatedSqlExecutor {
    async fn run(&self, query: &SqlQuery) -> Result<SqlOutcome, ExecutorError> {
        let start = tokio::time::Instant::now();
        pause(self.latency).await;
        let mut outcome = Self::respond(query);
        if outcome.error.is_none() {
            outcome.execution_time = Some(start.elapsed().as_millis() as u64);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rest_users_get() {
        let outcome = SimulatedRestExecutor::new()
            .run(&RestRequest::new(HttpMethod::Get, "https://api.example.com/users"))
            .await
            .unwrap();
        assert_eq!(outcome.status, Some(200));
        assert_eq!(outcome.data.unwrap()["total"], 2);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_rest_trigger_words_report_errors() {
        let executor = SimulatedRestExecutor::new();
        let failed = executor
            .run(&RestRequest::new(HttpMethod::Get, "https://x.io/FAIL"))
            .await
            .unwrap();
        assert_eq!(failed.status, Some(500));
        assert_eq!(failed.error.unwrap().code, Some(json!(500)));

        let missing = executor
            .run(&RestRequest::new(HttpMethod::Get, "https://x.io/missing/1"))
            .await
            .unwrap();
        assert_eq!(missing.status, Some(404));
        assert!(missing.data.is_none());
    }

    #[tokio::test]
    async fn test_rest_post_echoes_body() {
        let request = RestRequest::new(HttpMethod::Post, "https://x.io/items").with_body(r#"{"name":"a"}"#);
        let outcome = SimulatedRestExecutor::new().run(&request).await.unwrap();
        assert_eq!(outcome.status, Some(201));
        assert_eq!(outcome.data.unwrap()["data"], json!({"name": "a"}));

        let deleted = SimulatedRestExecutor::new()
            .run(&RestRequest::new(HttpMethod::Delete, "https://x.io/items/1"))
            .await
            .unwrap();
        assert_eq!(deleted.status, Some(204));
        assert_eq!(deleted.data, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_sql_users_select() {
        let outcome = SimulatedSqlExecutor::new()
            .run(&SqlQuery::new("SELECT * FROM users"))
            .await
            .unwrap();
        assert_eq!(outcome.row_count, Some(3));
        assert_eq!(outcome.data.unwrap()[2]["name"], "Bob Johnson");
        assert!(outcome.execution_time.is_some());
    }

    #[tokio::test]
    async fn test_sql_syntax_error_reports_column() {
        let outcome = SimulatedSqlExecutor::new()
            .run(&SqlQuery::new("SELECT syntax_error"))
            .await
            .unwrap();
        let error = outcome.error.unwrap();
        assert_eq!(error.code, Some(json!("SQL_SYNTAX_ERROR")));
        assert_eq!(error.details, Some(json!({"line": 1, "column": 7})));
        assert!(outcome.data.is_none());
    }

    #[tokio::test]
    async fn test_sql_statement_summaries() {
        let executor = SimulatedSqlExecutor::new();
        let ddl = executor.run(&SqlQuery::new("drop table t")).await.unwrap();
        assert_eq!(ddl.data.unwrap()["operation"], "DROP");
        assert_eq!(ddl.row_count, Some(0));

        let insert = executor.run(&SqlQuery::new("INSERT INTO t VALUES (1)")).await.unwrap();
        assert_eq!(insert.row_count, Some(1));

        let empty = executor.run(&SqlQuery::new("   ")).await.unwrap();
        assert_eq!(empty.error.unwrap().code, Some(json!("EMPTY_QUERY")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let start = tokio::time::Instant::now();
        SimulatedSqlExecutor::with_latency(Duration::from_millis(300))
            .run(&SqlQuery::new("SELECT 1"))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
