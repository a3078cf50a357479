//! Application state for workbench service.

use std::str::FromStr;
use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::catalog::InMemoryTableCatalog;
use crate::context::{Executors, WorkbenchContext};
use crate::draft_store::DraftStore;
use crate::repository::{DraftRepository, InMemoryDraftRepository, SqliteDraftRepository};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub workbench: Arc<WorkbenchContext>,
}

impl AppState {
    /// Creates the application state from configuration.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let repository: Arc<dyn DraftRepository> = match &config.database_url {
            Some(url) => {
                let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(5)
                    .connect_with(options)
                    .await?;
                tracing::info!(database_url = %url, "Draft persistence: SQLite");
                Arc::new(SqliteDraftRepository::new(pool).await?)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, drafts are kept in memory only");
                Arc::new(InMemoryDraftRepository::new())
            }
        };
        let store = Arc::new(DraftStore::load(repository).await?);

        let catalog = match &config.tables_file {
            Some(path) => InMemoryTableCatalog::from_file(path).await?,
            None => InMemoryTableCatalog::default(),
        };

        let executors = Executors::from_config(&config, reqwest::Client::new()).await?;
        tracing::info!(mode = ?config.executor_mode, "Executors ready");

        let workbench = WorkbenchContext::new(&config, store, executors, Arc::new(catalog));
        Ok(Self::with_context(config, workbench))
    }

    pub fn with_context(config: AppConfig, workbench: WorkbenchContext) -> Self {
        Self {
            config,
            workbench: Arc::new(workbench),
        }
    }
}
