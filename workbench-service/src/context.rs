//! Workbench context.
//!
//! Owns the draft store, autosave scheduler, execution engine, result slot and
//! table catalog of one workspace. Constructed once at startup and shared by
//! every request through [`crate::state::AppState`].

use std::sync::Arc;
use std::time::Duration;

use common::config::{AppConfig, ExecutorMode};
use common::errors::{AppError, AppResult};

use crate::autosave::{AutosaveScheduler, AutosaveSink};
use crate::catalog::TableCatalog;
use crate::draft_store::DraftStore;
use crate::engine::{ExecutionEngine, ResultSlot};
use crate::executor::{
    HttpRestExecutor, RestExecutor, SimulatedRestExecutor, SimulatedSqlExecutor, SqlExecutor,
    SqliteExecutor,
};

pub struct WorkbenchContext {
    pub store: Arc<DraftStore>,
    pub autosave: AutosaveScheduler,
    pub engine: ExecutionEngine,
    pub catalog: Arc<dyn TableCatalog>,
}

impl WorkbenchContext {
    /// Wires the components around `store`, committing autosaves into it.
    pub fn new(
        config: &AppConfig,
        store: Arc<DraftStore>,
        executors: Executors,
        catalog: Arc<dyn TableCatalog>,
    ) -> Self {
        let sink: Arc<dyn AutosaveSink> = store.clone();
        Self {
            autosave: AutosaveScheduler::new(sink, config.autosave_delay()),
            engine: ExecutionEngine::new(
                executors.rest,
                executors.sql,
                Arc::new(ResultSlot::new()),
                config.executor_timeout(),
            ),
            store,
            catalog,
        }
    }

    pub fn results(&self) -> &Arc<ResultSlot> {
        self.engine.results()
    }

    /// Ends the workspace session: pending autosaves are flushed, then the
    /// current draft and the current result are cleared.
    pub async fn reset(&self) -> AppResult<()> {
        let flushed = self.autosave.flush_all().await?;
        self.store.clear_current().await;
        self.results().clear().await;
        tracing::info!(flushed, "Workspace reset");
        Ok(())
    }
}

/// The executor pair used by the engine.
pub struct Executors {
    pub rest: Arc<dyn RestExecutor>,
    pub sql: Arc<dyn SqlExecutor>,
}

impl Executors {
    /// Canned executors, optionally delayed by `latency`.
    pub fn simulated(latency: Duration) -> Self {
        if latency.is_zero() {
            return Self {
                rest: Arc::new(SimulatedRestExecutor::new()),
                sql: Arc::new(SimulatedSqlExecutor::new()),
            };
        }
        Self {
            rest: Arc::new(SimulatedRestExecutor::with_latency(latency)),
            sql: Arc::new(SimulatedSqlExecutor::with_latency(latency)),
        }
    }

    /// Executors for the configured mode. Live mode needs a SQL target pool.
    pub async fn from_config(config: &AppConfig, http_client: reqwest::Client) -> AppResult<Self> {
        match config.executor_mode {
            ExecutorMode::Simulated => Ok(Self::simulated(config.simulated_latency())),
            ExecutorMode::Live => {
                let url = config.sql_target_url.as_deref().ok_or_else(|| {
                    AppError::Config("SQL_TARGET_URL is required when EXECUTOR_MODE=live".to_string())
                })?;
                let pool = sqlx::SqlitePool::connect(url).await?;
                tracing::info!(url = %url, "Live SQL executor connected");
                Ok(Self {
                    rest: Arc::new(HttpRestExecutor::new(http_client)),
                    sql: Arc::new(SqliteExecutor::new(pool)),
                })
            }
        }
    }
}
