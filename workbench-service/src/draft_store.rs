//! Draft store.
//!
//! Owns every draft, its cached warnings and the current-draft pointer. Each
//! mutation reads the full draft, computes the next version, persists it and
//! only then replaces the in-memory copy, all under the store's write lock.
//! Lock order is always `drafts` before `current`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::errors::{AppError, AppResult};
use common::models::{Draft, DraftContent, DraftKind, UpdateDraftRequest, Warning};
use common::utils::{DraftValidator, IdGenerator};

use crate::autosave::AutosaveSink;
use crate::repository::DraftRepository;

pub struct DraftStore {
    repository: Arc<dyn DraftRepository>,
    drafts: RwLock<HashMap<String, Draft>>,
    current: RwLock<Option<String>>,
}

impl DraftStore {
    /// Creates a store primed with every draft the repository holds.
    pub async fn load(repository: Arc<dyn DraftRepository>) -> AppResult<Self> {
        let drafts: HashMap<String, Draft> = repository
            .load_all()
            .await?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        tracing::info!(count = drafts.len(), "Drafts loaded");

        Ok(Self {
            repository,
            drafts: RwLock::new(drafts),
            current: RwLock::new(None),
        })
    }

    /// Creates a draft, persists it and makes it the current draft.
    pub async fn create(
        &self,
        kind: DraftKind,
        connection_id: impl Into<String>,
        title: Option<String>,
        initial_content: &DraftContent,
    ) -> AppResult<String> {
        let id = IdGenerator::draft_id();
        let now = Utc::now();
        let draft = Draft {
            warnings: derive_warnings(&id, kind, initial_content),
            id: id.clone(),
            connection_id: connection_id.into(),
            kind,
            title,
            content: initial_content.encode(),
            created_at: now,
            updated_at: now,
        };

        let mut drafts = self.drafts.write().await;
        self.repository.save(&draft).await?;
        drafts.insert(id.clone(), draft);
        *self.current.write().await = Some(id.clone());

        tracing::info!(draft_id = %id, kind = %kind, "Draft created");
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> AppResult<Draft> {
        self.drafts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::DraftNotFound(id.to_string()))
    }

    /// All drafts, most recently updated first.
    pub async fn list(&self) -> Vec<Draft> {
        let mut drafts: Vec<Draft> = self.drafts.read().await.values().cloned().collect();
        drafts.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        drafts
    }

    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }

    /// Applies `patch`, refreshing `updated_at`. Warnings are recomputed when
    /// the content or the kind changes.
    pub async fn update(&self, id: &str, patch: UpdateDraftRequest) -> AppResult<Draft> {
        let mut drafts = self.drafts.write().await;
        let current = drafts
            .get(id)
            .ok_or_else(|| AppError::DraftNotFound(id.to_string()))?;

        let mut next = current.clone();
        let mut revalidate = false;
        if let Some(connection_id) = patch.connection_id {
            next.connection_id = connection_id;
        }
        if let Some(title) = patch.title {
            next.title = Some(title);
        }
        if let Some(kind) = patch.kind {
            revalidate |= kind != next.kind;
            next.kind = kind;
        }
        if let Some(content) = patch.content {
            next.content = content.encode();
            revalidate = true;
        }
        if revalidate {
            next.warnings = derive_warnings(id, next.kind, &next.decoded_content());
        }
        next.updated_at = Utc::now();

        self.repository.save(&next).await?;
        drafts.insert(id.to_string(), next.clone());

        tracing::debug!(draft_id = %id, revalidated = revalidate, "Draft updated");
        Ok(next)
    }

    /// Replaces the encoded content verbatim. No-op when unchanged.
    async fn replace_content(&self, id: &str, encoded: &str) -> AppResult<bool> {
        let mut drafts = self.drafts.write().await;
        let current = drafts
            .get(id)
            .ok_or_else(|| AppError::DraftNotFound(id.to_string()))?;
        if current.content == encoded {
            return Ok(false);
        }

        let mut next = current.clone();
        next.content = encoded.to_string();
        next.warnings = derive_warnings(id, next.kind, &next.decoded_content());
        next.updated_at = Utc::now();

        self.repository.save(&next).await?;
        drafts.insert(id.to_string(), next);
        Ok(true)
    }

    /// Removes a draft, clearing the current pointer if it targeted `id`.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let mut drafts = self.drafts.write().await;
        if !drafts.contains_key(id) {
            return Err(AppError::DraftNotFound(id.to_string()));
        }

        self.repository.delete(id).await?;
        drafts.remove(id);

        let mut current = self.current.write().await;
        if current.as_deref() == Some(id) {
            *current = None;
        }

        tracing::info!(draft_id = %id, "Draft deleted");
        Ok(())
    }

    pub async fn select_current(&self, id: &str) -> AppResult<()> {
        let drafts = self.drafts.read().await;
        if !drafts.contains_key(id) {
            return Err(AppError::DraftNotFound(id.to_string()));
        }
        *self.current.write().await = Some(id.to_string());
        Ok(())
    }

    pub async fn current(&self) -> Option<Draft> {
        let id = self.current.read().await.clone()?;
        self.drafts.read().await.get(&id).cloned()
    }

    pub async fn clear_current(&self) {
        *self.current.write().await = None;
    }
}

#[async_trait]
impl AutosaveSink for DraftStore {
    async fn commit(&self, draft_id: &str, content: &str) -> AppResult<()> {
        if self.replace_content(draft_id, content).await? {
            tracing::debug!(draft_id = %draft_id, "Autosave committed");
        }
        Ok(())
    }
}

fn derive_warnings(draft_id: &str, kind: DraftKind, content: &DraftContent) -> Vec<Warning> {
    DraftValidator::validate(kind, content)
        .attach_to(draft_id)
        .into_warnings()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use common::models::{HttpMethod, RestRequest, Severity};

    use crate::repository::InMemoryDraftRepository;

    async fn store() -> (DraftStore, Arc<InMemoryDraftRepository>) {
        let repo = Arc::new(InMemoryDraftRepository::new());
        let store = DraftStore::load(repo.clone()).await.unwrap();
        (store, repo)
    }

    #[tokio::test]
    async fn test_create_persists_and_selects() {
        let (store, repo) = store().await;
        let id = store
            .create(DraftKind::Sql, "conn-1", Some("Users".into()), &DraftContent::with_sql("SELECT 1"))
            .await
            .unwrap();

        let draft = store.get(&id).await.unwrap();
        assert_eq!(draft.connection_id, "conn-1");
        assert_eq!(draft.created_at, draft.updated_at);
        assert!(draft.warnings.is_empty());
        assert_eq!(store.current().await.unwrap().id, id);
        assert_eq!(repo.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_caches_warnings_for_kind() {
        let (store, _) = store().await;
        let id = store
            .create(DraftKind::Rest, "", None, &DraftContent::default())
            .await
            .unwrap();
        let draft = store.get(&id).await.unwrap();
        assert_eq!(draft.warnings.len(), 1);
        assert_eq!(draft.warnings[0].severity, Severity::Error);
        assert_eq!(draft.warnings[0].draft_id, id);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let (store, _) = store().await;
        assert!(matches!(store.get("nope").await, Err(AppError::DraftNotFound(_))));
        assert!(matches!(
            store.update("nope", UpdateDraftRequest::title("x")).await,
            Err(AppError::DraftNotFound(_))
        ));
        assert!(matches!(store.delete("nope").await, Err(AppError::DraftNotFound(_))));
        assert!(matches!(store.select_current("nope").await, Err(AppError::DraftNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp_and_keeps_slots() {
        let (store, _) = store().await;
        let content = DraftContent {
            rest: Some(RestRequest::new(HttpMethod::Get, "https://example.com")),
            ..DraftContent::with_sql("SELECT * FROM users")
        };
        let id = store.create(DraftKind::Rest, "", None, &content).await.unwrap();
        let before = store.get(&id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let after = store.update(&id, UpdateDraftRequest::kind(DraftKind::Sql)).await.unwrap();

        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.kind, DraftKind::Sql);
        assert_eq!(after.content, before.content);
        assert_eq!(after.decoded_content().rest_or_default().url, "https://example.com");
    }

    #[tokio::test]
    async fn test_update_recomputes_warnings() {
        let (store, _) = store().await;
        let id = store
            .create(DraftKind::Sql, "", None, &DraftContent::with_sql("SELECT 1"))
            .await
            .unwrap();

        let draft = store
            .update(&id, UpdateDraftRequest::content(DraftContent::with_sql("DELETE FROM users")))
            .await
            .unwrap();
        assert_eq!(draft.warnings.len(), 1);
        assert_eq!(draft.warnings[0].field.as_deref(), Some("query"));

        // Switching to REST validates the (default) REST slot instead.
        let draft = store.update(&id, UpdateDraftRequest::kind(DraftKind::Rest)).await.unwrap();
        assert_eq!(draft.warnings[0].field.as_deref(), Some("url"));
    }

    #[tokio::test]
    async fn test_list_orders_by_updated_at_desc() {
        let (store, _) = store().await;
        let first = store.create(DraftKind::Sql, "", None, &DraftContent::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.create(DraftKind::Sql, "", None, &DraftContent::default()).await.unwrap();

        let ids: Vec<String> = store.list().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![second.clone(), first.clone()]);

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.update(&first, UpdateDraftRequest::title("touched")).await.unwrap();
        let ids: Vec<String> = store.list().await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn test_delete_clears_current_only_for_target() {
        let (store, repo) = store().await;
        let a = store.create(DraftKind::Sql, "", None, &DraftContent::default()).await.unwrap();
        let b = store.create(DraftKind::Sql, "", None, &DraftContent::default()).await.unwrap();

        store.select_current(&a).await.unwrap();
        store.delete(&b).await.unwrap();
        assert_eq!(store.current().await.unwrap().id, a);

        store.delete(&a).await.unwrap();
        assert!(store.current().await.is_none());
        assert!(repo.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_autosave_commit_skips_identical_content() {
        let (store, _) = store().await;
        let content = DraftContent::with_sql("SELECT 1");
        let id = store.create(DraftKind::Sql, "", None, &content).await.unwrap();
        let before = store.get(&id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.commit(&id, &content.encode()).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().updated_at, before.updated_at);

        let edited = DraftContent::with_sql("SELECT 2").encode();
        store.commit(&id, &edited).await.unwrap();
        let after = store.get(&id).await.unwrap();
        assert_eq!(after.content, edited);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn test_load_restores_persisted_drafts() {
        let repo = Arc::new(InMemoryDraftRepository::new());
        let id = {
            let store = DraftStore::load(repo.clone()).await.unwrap();
            store.create(DraftKind::Rest, "c", None, &DraftContent::default()).await.unwrap()
        };
        let reloaded = DraftStore::load(repo).await.unwrap();
        assert_eq!(reloaded.get(&id).await.unwrap().connection_id, "c");
        assert!(reloaded.current().await.is_none());
    }
}
