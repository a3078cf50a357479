//! Table metadata catalog backing quick CRUD generation.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::errors::{AppError, AppResult};
use common::models::Table;

#[async_trait]
pub trait TableCatalog: Send + Sync {
    async fn get_table(&self, id: &str) -> AppResult<Table>;

    async fn list_tables(&self) -> Vec<Table>;
}

/// Catalog held in memory, in insertion order.
#[derive(Default)]
pub struct InMemoryTableCatalog {
    tables: RwLock<Vec<Table>>,
}

impl InMemoryTableCatalog {
    /// Loads a JSON array of tables.
    pub async fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let tables: Vec<Table> = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("Invalid table file {}: {}", path.display(), e)))?;

        let catalog = Self::default();
        for table in tables {
            catalog.upsert(table).await;
        }
        tracing::info!(path = %path.display(), count = catalog.tables.read().await.len(), "Table catalog loaded");
        Ok(catalog)
    }

    /// Inserts `table` or replaces the table with the same id.
    pub async fn upsert(&self, table: Table) {
        let mut tables = self.tables.write().await;
        match tables.iter_mut().find(|t| t.id == table.id) {
            Some(existing) => *existing = table,
            None => tables.push(table),
        }
    }
}

#[async_trait]
impl TableCatalog for InMemoryTableCatalog {
    async fn get_table(&self, id: &str) -> AppResult<Table> {
        self.tables
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| AppError::TableNotFound(id.to_string()))
    }

    async fn list_tables(&self) -> Vec<Table> {
        self.tables.read().await.clone()
    }
}
