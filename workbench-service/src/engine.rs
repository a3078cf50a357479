//! Execution engine.
//!
//! Validates a draft, runs it through the executor for its kind and publishes
//! the normalized [`ExecutionResult`] to the shared [`ResultSlot`]. Drafts with
//! validation errors never reach an executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use common::models::{
    Draft, DraftContent, DraftKind, ExecutionError, ExecutionMetadata, ExecutionResult,
    ExecutionStatus, RestRequest, Severity, SqlQuery, ValidationReport,
};
use common::utils::{DraftValidator, IdGenerator, ResultFormatter};

use crate::executor::{ExecutorError, RestExecutor, SqlExecutor};

/// Outcome of an execution request.
#[derive(Debug, Clone)]
pub enum Execution {
    /// Validation found errors; nothing ran.
    Rejected(ValidationReport),
    Completed(ExecutionResult),
}

#[derive(Debug, Default)]
struct SlotState {
    current: Option<ExecutionResult>,
    issued: u64,
    applied: u64,
}

/// The single "current result" shared by all drafts.
///
/// Each execution takes a token when it starts. A completion is published
/// only if no later-started execution has been published already.
#[derive(Default)]
pub struct ResultSlot {
    state: RwLock<SlotState>,
    /// Kept outside the lock so a dropped execution can always release it.
    in_flight: AtomicUsize,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    async fn begin(&self) -> u64 {
        let mut state = self.state.write().await;
        state.issued += 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        state.issued
    }

    /// Returns whether `result` was published.
    async fn complete(&self, token: u64, result: ExecutionResult) -> bool {
        let mut state = self.state.write().await;
        if token <= state.applied {
            return false;
        }
        state.applied = token;
        state.current = Some(result);
        true
    }

    pub async fn current(&self) -> Option<ExecutionResult> {
        self.state.read().await.current.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        // Executions started before the clear must not resurrect a result.
        state.applied = state.issued;
        state.current = None;
    }
}

/// Releases the slot's loading state when the execution finishes or its
/// future is dropped.
struct InFlight<'a> {
    slot: &'a ResultSlot,
    token: u64,
}

impl InFlight<'_> {
    async fn finish(self, result: ExecutionResult) -> bool {
        self.slot.complete(self.token, result).await
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.slot.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ExecutionEngine {
    rest: Arc<dyn RestExecutor>,
    sql: Arc<dyn SqlExecutor>,
    results: Arc<ResultSlot>,
    timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(
        rest: Arc<dyn RestExecutor>,
        sql: Arc<dyn SqlExecutor>,
        results: Arc<ResultSlot>,
        timeout: Duration,
    ) -> Self {
        Self {
            rest,
            sql,
            results,
            timeout,
        }
    }

    pub fn results(&self) -> &Arc<ResultSlot> {
        &self.results
    }

    /// Executes `draft` with its stored content.
    pub async fn execute(&self, draft: &Draft) -> Execution {
        self.execute_content(draft, &draft.decoded_content()).await
    }

    /// Executes `draft` with `content` in place of its stored content.
    pub async fn execute_content(&self, draft: &Draft, content: &DraftContent) -> Execution {
        let report = DraftValidator::validate(draft.kind, content).attach_to(&draft.id);
        if report.has_errors() {
            tracing::info!(
                draft_id = %draft.id,
                errors = report.count(Severity::Error),
                "Execution rejected by validation"
            );
            return Execution::Rejected(report);
        }

        let guard = InFlight {
            slot: &self.results,
            token: self.results.begin().await,
        };
        let start = Instant::now();

        let (status, raw_result, metadata) = match draft.kind {
            DraftKind::Rest => self.run_rest(&content.rest_or_default()).await,
            DraftKind::Sql => self.run_sql(&content.sql_or_default()).await,
        };
        let duration = start.elapsed().as_millis() as u64;

        let result = ExecutionResult {
            id: IdGenerator::result_id(),
            draft_id: draft.id.clone(),
            kind: draft.kind,
            status,
            formatted_result: ResultFormatter::format(&raw_result, draft.kind),
            raw_result,
            metadata,
            executed_at: Utc::now(),
            duration,
        };

        tracing::info!(
            draft_id = %draft.id,
            kind = %draft.kind,
            status = ?result.status,
            duration_ms = duration,
            "Draft executed"
        );

        if !guard.finish(result.clone()).await {
            tracing::debug!(draft_id = %draft.id, "Superseded result discarded");
        }
        Execution::Completed(result)
    }

    async fn run_rest(&self, request: &RestRequest) -> (ExecutionStatus, Value, ExecutionMetadata) {
        let mut metadata = ExecutionMetadata {
            request_url: Some(request.url.clone()),
            request_method: Some(request.method.to_string()),
            ..Default::default()
        };

        let outcome = match tokio::time::timeout(self.timeout, self.rest.run(request)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => return failure(e, metadata),
            Err(_) => return failure(ExecutorError::Timeout(self.timeout), metadata),
        };

        let raw = payload_or_outcome(outcome.data.clone(), &outcome);
        metadata.status_code = outcome.status;
        metadata.status_text = outcome.status_text;
        metadata.headers = (!outcome.headers.is_empty()).then_some(outcome.headers);
        metadata.response_size = Some(raw.to_string().len());
        let status = status_of(&outcome.error);
        metadata.error = outcome.error;
        (status, raw, metadata)
    }

    async fn run_sql(&self, query: &SqlQuery) -> (ExecutionStatus, Value, ExecutionMetadata) {
        let metadata = ExecutionMetadata::default();

        let outcome = match tokio::time::timeout(self.timeout, self.sql.run(query)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => return failure(e, metadata),
            Err(_) => return failure(ExecutorError::Timeout(self.timeout), metadata),
        };

        let raw = payload_or_outcome(outcome.data.clone(), &outcome);
        let status = status_of(&outcome.error);
        let metadata = ExecutionMetadata {
            rows_affected: Some(outcome.row_count.unwrap_or(0)),
            execution_time: outcome.execution_time,
            error: outcome.error,
            ..metadata
        };
        (status, raw, metadata)
    }
}

/// The executor's payload, or the whole outcome when it carried none.
fn payload_or_outcome<T: serde::Serialize>(data: Option<Value>, outcome: &T) -> Value {
    match data {
        Some(data) if !data.is_null() => data,
        _ => serde_json::to_value(outcome).unwrap_or(Value::Null),
    }
}

fn status_of(error: &Option<ExecutionError>) -> ExecutionStatus {
    if error.is_some() {
        ExecutionStatus::Error
    } else {
        ExecutionStatus::Success
    }
}

fn failure(
    err: ExecutorError,
    mut metadata: ExecutionMetadata,
) -> (ExecutionStatus, Value, ExecutionMetadata) {
    tracing::warn!(error = %err, "Executor failed");
    let error = ExecutionError::from(err);
    let raw = serde_json::json!({ "error": &error });
    metadata.error = Some(error);
    (ExecutionStatus::Error, raw, metadata)
}
