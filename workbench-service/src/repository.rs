//! Draft persistence backends.
//!
//! The draft store writes every committed draft through a [`DraftRepository`].
//! Writes are whole-draft upserts; the last write wins.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use common::errors::{AppError, AppResult};
use common::models::{Draft, DraftKind, Warning};

/// Persistence backend for drafts.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Loads every stored draft.
    async fn load_all(&self) -> AppResult<Vec<Draft>>;

    /// Inserts or replaces `draft`.
    async fn save(&self, draft: &Draft) -> AppResult<()>;

    /// Removes a draft. Returns whether a row existed.
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

/// Process-local backend; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryDraftRepository {
    drafts: RwLock<HashMap<String, Draft>>,
}

impl InMemoryDraftRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftRepository for InMemoryDraftRepository {
    async fn load_all(&self) -> AppResult<Vec<Draft>> {
        Ok(self.drafts.read().await.values().cloned().collect())
    }

    async fn save(&self, draft: &Draft) -> AppResult<()> {
        self.drafts
            .write()
            .await
            .insert(draft.id.clone(), draft.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.drafts.write().await.remove(id).is_some())
    }
}

/// Row from the `request_drafts` table.
#[derive(sqlx::FromRow)]
struct DraftRow {
    id: String,
    connection_id: String,
    kind: String,
    title: Option<String>,
    content: String,
    warnings: String,
    created_at: String,
    updated_at: String,
}

impl DraftRow {
    fn into_draft(self) -> AppResult<Draft> {
        let kind: DraftKind = self
            .kind
            .parse()
            .map_err(|e: String| AppError::DatabaseQuery(format!("draft {}: {}", self.id, e)))?;
        // Warnings are derived data; an unreadable cache is recomputed on the next edit.
        let warnings: Vec<Warning> = serde_json::from_str(&self.warnings).unwrap_or_default();

        Ok(Draft {
            created_at: parse_timestamp(&self.id, &self.created_at)?,
            updated_at: parse_timestamp(&self.id, &self.updated_at)?,
            id: self.id,
            connection_id: self.connection_id,
            kind,
            title: self.title,
            content: self.content,
            warnings,
        })
    }
}

fn parse_timestamp(id: &str, raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::DatabaseQuery(format!("draft {}: bad timestamp {:?}: {}", id, raw, e)))
}

/// SQLite backend.
pub struct SqliteDraftRepository {
    pool: SqlitePool,
}

impl SqliteDraftRepository {
    /// Wraps `pool` and creates the `request_drafts` table if needed.
    pub async fn new(pool: SqlitePool) -> AppResult<Self> {
        let repo = Self { pool };
        repo.ensure_table().await?;
        Ok(repo)
    }

    async fn ensure_table(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS request_drafts (
                id            TEXT PRIMARY KEY NOT NULL,
                connection_id TEXT NOT NULL,
                kind          TEXT NOT NULL,
                title         TEXT,
                content       TEXT NOT NULL,
                warnings      TEXT NOT NULL DEFAULT '[]',
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(format!("Failed to create request_drafts table: {}", e)))?;

        tracing::info!("Table `request_drafts` ensured");
        Ok(())
    }
}

#[async_trait]
impl DraftRepository for SqliteDraftRepository {
    async fn load_all(&self) -> AppResult<Vec<Draft>> {
        let rows: Vec<DraftRow> = sqlx::query_as(
            "SELECT id, connection_id, kind, title, content, warnings, created_at, updated_at
             FROM request_drafts",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(format!("Failed to load drafts: {}", e)))?;

        rows.into_iter().map(DraftRow::into_draft).collect()
    }

    async fn save(&self, draft: &Draft) -> AppResult<()> {
        let warnings = serde_json::to_string(&draft.warnings)?;

        sqlx::query(
            "INSERT INTO request_drafts
                (id, connection_id, kind, title, content, warnings, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                connection_id = excluded.connection_id,
                kind          = excluded.kind,
                title         = excluded.title,
                content       = excluded.content,
                warnings      = excluded.warnings,
                updated_at    = excluded.updated_at",
        )
        .bind(&draft.id)
        .bind(&draft.connection_id)
        .bind(draft.kind.as_str())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(warnings)
        .bind(draft.created_at.to_rfc3339())
        .bind(draft.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(format!("Failed to save draft: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM request_drafts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseQuery(format!("Failed to delete draft: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
