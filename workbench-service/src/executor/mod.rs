//! Request and query executors.
//!
//! An executor either returns an outcome (which may itself report an error,
//! e.g. an HTTP 404 or a SQL syntax error) or fails outright with an
//! [`ExecutorError`]. The engine turns both into an execution result.

mod http;
mod simulated;
mod sqlite;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use common::models::{ExecutionError, RestRequest, SqlQuery};

pub use http::HttpRestExecutor;
pub use simulated::{SimulatedRestExecutor, SimulatedSqlExecutor};
pub use sqlite::SqliteExecutor;

/// Failure to obtain any outcome from an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ExecutorError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Network(_) => "NETWORK_ERROR",
            ExecutorError::Database(_) => "DATABASE_ERROR",
            ExecutorError::Timeout(_) => "TIMEOUT",
            ExecutorError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }
}

impl From<ExecutorError> for ExecutionError {
    fn from(err: ExecutorError) -> Self {
        ExecutionError::new(err.to_string()).with_code(err.code())
    }
}

/// Response of a REST executor.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

/// Response of a SQL executor.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SqlOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Milliseconds spent in the database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

#[async_trait]
pub trait RestExecutor: Send + Sync {
    async fn run(&self, request: &RestRequest) -> Result<RestOutcome, ExecutorError>;
}

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn run(&self, query: &SqlQuery) -> Result<SqlOutcome, ExecutorError>;
}
