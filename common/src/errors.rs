//! Application error types.
//!
//! Every fallible operation in the workspace returns [`AppResult`]. Errors are
//! rendered as the standard [`ApiResponse`] error envelope when they reach an
//! HTTP handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Errors raised by the workbench.
///
/// Validation findings on draft content are *not* errors; they are reported
/// as warnings. Executor failures are captured into execution results.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unknown draft id.
    #[error("draft not found: {0}")]
    DraftNotFound(String),

    /// Unknown table id.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Malformed request body.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Persistence backend failure.
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    /// Failure talking to an external collaborator.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Machine readable error code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DraftNotFound(_) => "DRAFT_NOT_FOUND",
            AppError::TableNotFound(_) => "TABLE_NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_ERROR",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DraftNotFound(_) | AppError::TableNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseQuery(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseQuery(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization failed: {}", err))
    }
}
