//! 工作台服务模块
//!
//! 将草稿存储、自动保存、执行引擎与表目录组合为面向请求的操作。

use std::sync::Arc;

use validator::Validate;

use common::errors::AppResult;
use common::models::{
    CreateDraftRequest, CrudAction, CrudTemplates, Draft, DraftContent, DraftKind,
    EditContentRequest, ExecutionResult, Table, UpdateDraftRequest, ValidationSummary,
};
use common::utils::{CrudTemplateGenerator, DraftValidator};

use crate::context::WorkbenchContext;
use crate::engine::Execution;

/// 工作台服务
pub struct WorkbenchService {
    ctx: Arc<WorkbenchContext>,
}

impl WorkbenchService {
    /// 创建新的工作台服务实例
    pub fn new(ctx: Arc<WorkbenchContext>) -> Self {
        Self { ctx }
    }

    /// 创建草稿并设为当前草稿
    pub async fn create_draft(&self, req: CreateDraftRequest) -> AppResult<Draft> {
        req.validate()?;
        let content = req.content.unwrap_or_default();
        let id = self
            .ctx
            .store
            .create(req.kind, req.connection_id, req.title, &content)
            .await?;
        self.ctx.store.get(&id).await
    }

    pub async fn list_drafts(&self) -> Vec<Draft> {
        self.ctx.store.list().await
    }

    pub async fn get_draft(&self, id: &str) -> AppResult<Draft> {
        self.ctx.store.get(id).await
    }

    pub async fn current_draft(&self) -> Option<Draft> {
        self.ctx.store.current().await
    }

    /// 更新草稿；显式提交的内容会取代尚未保存的编辑
    ///
    /// 写入失败时恢复被取代的编辑，使其仍可被自动保存。
    pub async fn update_draft(&self, id: &str, req: UpdateDraftRequest) -> AppResult<Draft> {
        req.validate()?;
        let Some(content) = &req.content else {
            return self.ctx.store.update(id, req).await;
        };

        let stored = self.ctx.store.get(id).await?;
        let pending = self.ctx.autosave.pending_content(id).await;
        self.ctx.autosave.supersede(id, &content.encode()).await;

        match self.ctx.store.update(id, req).await {
            Ok(draft) => Ok(draft),
            Err(e) => {
                self.ctx.autosave.supersede(id, &stored.content).await;
                if let Some(pending) = pending {
                    self.ctx.autosave.schedule(id, pending).await;
                }
                tracing::warn!(draft_id = %id, error = %e, "Draft update failed, pending edit restored");
                Err(e)
            }
        }
    }

    /// 删除草稿并丢弃其待保存的编辑
    pub async fn delete_draft(&self, id: &str) -> AppResult<()> {
        self.ctx.store.delete(id).await?;
        self.ctx.autosave.forget(id).await;
        Ok(())
    }

    pub async fn select_draft(&self, id: &str) -> AppResult<Draft> {
        self.ctx.store.select_current(id).await?;
        self.ctx.store.get(id).await
    }

    /// 编辑草稿内容：立即校验，经防抖后自动保存
    pub async fn edit_content(&self, id: &str, edit: EditContentRequest) -> AppResult<ValidationSummary> {
        let draft = self.ctx.store.get(id).await?;
        let mut merged = DraftContent::default();
        self.ctx
            .autosave
            .schedule_edit(id, &draft.content, |current| {
                merged = DraftContent::decode(current);
                merged.merge(edit.into());
                merged.encode()
            })
            .await;

        let report = DraftValidator::validate(draft.kind, &merged).attach_to(id);

        tracing::debug!(draft_id = %id, findings = report.warnings.len(), "Draft edited");
        Ok(report.summary())
    }

    /// 立即保存待保存的编辑
    pub async fn save_draft(&self, id: &str) -> AppResult<Draft> {
        self.ctx.store.get(id).await?;
        self.ctx.autosave.flush(id).await?;
        self.ctx.store.get(id).await
    }

    /// 校验草稿的当前编辑内容
    pub async fn validate_draft(&self, id: &str) -> AppResult<ValidationSummary> {
        let (draft, content) = self.working_copy(id).await?;
        Ok(DraftValidator::validate(draft.kind, &content)
            .attach_to(id)
            .summary())
    }

    /// 执行草稿的当前编辑内容
    pub async fn execute_draft(&self, id: &str) -> AppResult<Execution> {
        let draft = self.ctx.store.get(id).await?;
        let execution = match self.ctx.autosave.pending_content(id).await {
            Some(pending) => {
                self.ctx
                    .engine
                    .execute_content(&draft, &DraftContent::decode(&pending))
                    .await
            }
            None => self.ctx.engine.execute(&draft).await,
        };
        Ok(execution)
    }

    pub async fn current_result(&self) -> Option<ExecutionResult> {
        self.ctx.results().current().await
    }

    pub async fn is_loading(&self) -> bool {
        self.ctx.results().is_loading().await
    }

    pub async fn clear_result(&self) {
        self.ctx.results().clear().await
    }

    pub async fn list_tables(&self) -> Vec<Table> {
        self.ctx.catalog.list_tables().await
    }

    pub async fn crud_templates(&self, table_id: &str) -> AppResult<CrudTemplates> {
        let table = self.ctx.catalog.get_table(table_id).await?;
        Ok(CrudTemplateGenerator::generate(&table))
    }

    /// 以 CRUD 模板创建 SQL 草稿并设为当前草稿
    pub async fn draft_from_template(
        &self,
        table_id: &str,
        action: CrudAction,
        connection_id: String,
    ) -> AppResult<Draft> {
        let table = self.ctx.catalog.get_table(table_id).await?;
        let templates = CrudTemplateGenerator::generate(&table);
        let title = format!("{} {}", action.as_str().to_uppercase(), table.name);
        let content = DraftContent::with_sql(templates.get(action));

        let id = self
            .ctx
            .store
            .create(DraftKind::Sql, connection_id, Some(title), &content)
            .await?;
        tracing::info!(draft_id = %id, table = %table.name, action = action.as_str(), "Draft created from template");
        self.ctx.store.get(&id).await
    }

    pub async fn reset_workspace(&self) -> AppResult<()> {
        self.ctx.reset().await
    }

    /// Stored draft with pending edits applied.
    async fn working_copy(&self, id: &str) -> AppResult<(Draft, DraftContent)> {
        let draft = self.ctx.store.get(id).await?;
        let content = match self.ctx.autosave.pending_content(id).await {
            Some(pending) => DraftContent::decode(&pending),
            None => draft.decoded_content(),
        };
        Ok((draft, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use common::config::AppConfig;
    use common::errors::AppError;
    use common::models::{HttpMethod, RestRequest, SqlQuery, TableColumn};

    use crate::catalog::{InMemoryTableCatalog, TableCatalog};
    use crate::context::tests::test_context;
    use crate::context::Executors;
    use crate::draft_store::DraftStore;
    use crate::repository::{DraftRepository, InMemoryDraftRepository};

    /// In-memory repository whose writes can be switched to fail.
    #[derive(Default)]
    struct FlakyRepository {
        inner: InMemoryDraftRepository,
        failing: AtomicBool,
    }

    #[async_trait]
    impl DraftRepository for FlakyRepository {
        async fn load_all(&self) -> AppResult<Vec<Draft>> {
            self.inner.load_all().await
        }

        async fn save(&self, draft: &Draft) -> AppResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::DatabaseQuery("database is locked".into()));
            }
            self.inner.save(draft).await
        }

        async fn delete(&self, id: &str) -> AppResult<bool> {
            self.inner.delete(id).await
        }
    }

    async fn service_over(repository: Arc<FlakyRepository>) -> WorkbenchService {
        let store = Arc::new(DraftStore::load(repository).await.unwrap());
        let ctx = WorkbenchContext::new(
            &AppConfig::default(),
            store,
            Executors::simulated(Duration::ZERO),
            Arc::new(InMemoryTableCatalog::default()),
        );
        WorkbenchService::new(Arc::new(ctx))
    }

    async fn service() -> WorkbenchService {
        WorkbenchService::new(Arc::new(test_context().await))
    }

    fn create(kind: DraftKind) -> CreateDraftRequest {
        CreateDraftRequest {
            connection_id: "conn-1".into(),
            kind,
            title: None,
            content: None,
        }
    }

    fn sql_edit(query: &str) -> EditContentRequest {
        EditContentRequest {
            rest: None,
            sql: Some(SqlQuery::new(query)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_are_debounced_into_one_save() {
        let service = service().await;
        let draft = service.create_draft(create(DraftKind::Sql)).await.unwrap();

        for query in ["S", "SEL", "SELECT * FROM users"] {
            service.edit_content(&draft.id, sql_edit(query)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(service.get_draft(&draft.id).await.unwrap().content, draft.content);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let saved = service.get_draft(&draft.id).await.unwrap();
        assert_eq!(saved.decoded_content().sql_or_default().query, "SELECT * FROM users");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_keeps_other_slot_and_reports_findings() {
        let service = service().await;
        let draft = service.create_draft(create(DraftKind::Rest)).await.unwrap();

        let summary = service
            .edit_content(
                &draft.id,
                EditContentRequest {
                    rest: Some(RestRequest::new(HttpMethod::Get, "example.com")),
                    sql: None,
                },
            )
            .await
            .unwrap();
        assert!(summary.is_valid);
        assert!(summary.has_warnings);

        service.edit_content(&draft.id, sql_edit("SELECT 1")).await.unwrap();
        let saved = service.save_draft(&draft.id).await.unwrap();
        let content = saved.decoded_content();
        assert_eq!(content.rest_or_default().url, "example.com");
        assert_eq!(content.sql_or_default().query, "SELECT 1");
        assert_eq!(saved.warnings.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_uses_pending_edits() {
        let service = service().await;
        let draft = service.create_draft(create(DraftKind::Sql)).await.unwrap();

        // Stored content has an empty query and would be rejected.
        service
            .edit_content(&draft.id, sql_edit("SELECT * FROM users"))
            .await
            .unwrap();
        match service.execute_draft(&draft.id).await.unwrap() {
            Execution::Completed(result) => {
                assert!(result.is_success());
                assert_eq!(result.metadata.rows_affected, Some(3));
            }
            Execution::Rejected(report) => panic!("unexpected rejection: {:?}", report),
        }
        assert!(service.current_result().await.is_some());
        assert!(!service.is_loading().await);
    }

    #[tokio::test]
    async fn test_update_with_content_supersedes_pending_edit() {
        let service = service().await;
        let draft = service.create_draft(create(DraftKind::Sql)).await.unwrap();
        service.edit_content(&draft.id, sql_edit("SELECT typed")).await.unwrap();

        service
            .update_draft(&draft.id, UpdateDraftRequest::content(DraftContent::with_sql("SELECT saved")))
            .await
            .unwrap();
        service.save_draft(&draft.id).await.unwrap();

        let stored = service.get_draft(&draft.id).await.unwrap();
        assert_eq!(stored.decoded_content().sql_or_default().query, "SELECT saved");
    }

    #[tokio::test]
    async fn test_failed_content_update_keeps_typed_edit() {
        let repository = Arc::new(FlakyRepository::default());
        let service = service_over(repository.clone()).await;
        let draft = service.create_draft(create(DraftKind::Sql)).await.unwrap();
        service.edit_content(&draft.id, sql_edit("SELECT typed")).await.unwrap();

        repository.failing.store(true, Ordering::SeqCst);
        let update = service
            .update_draft(&draft.id, UpdateDraftRequest::content(DraftContent::with_sql("SELECT saved")))
            .await;
        assert!(matches!(update, Err(AppError::DatabaseQuery(_))));
        let pending = service.ctx.autosave.pending_content(&draft.id).await.unwrap();
        assert_eq!(DraftContent::decode(&pending).sql_or_default().query, "SELECT typed");

        repository.failing.store(false, Ordering::SeqCst);
        let saved = service.save_draft(&draft.id).await.unwrap();
        assert_eq!(saved.decoded_content().sql_or_default().query, "SELECT typed");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_edits_of_both_slots_are_kept() {
        let service = Arc::new(service().await);
        let draft = service.create_draft(create(DraftKind::Rest)).await.unwrap();

        for round in 0..50 {
            let url = format!("https://api.example.com/{}", round);
            let query = format!("SELECT {}", round);
            let rest_edit = {
                let service = service.clone();
                let id = draft.id.clone();
                let url = url.clone();
                tokio::spawn(async move {
                    let edit = EditContentRequest {
                        rest: Some(RestRequest::new(HttpMethod::Get, url)),
                        sql: None,
                    };
                    service.edit_content(&id, edit).await
                })
            };
            let sql_task = {
                let service = service.clone();
                let id = draft.id.clone();
                let query = query.clone();
                tokio::spawn(async move { service.edit_content(&id, sql_edit(&query)).await })
            };
            rest_edit.await.unwrap().unwrap();
            sql_task.await.unwrap().unwrap();

            let pending = service.ctx.autosave.pending_content(&draft.id).await.unwrap();
            let content = DraftContent::decode(&pending);
            assert_eq!(content.rest_or_default().url, url);
            assert_eq!(content.sql_or_default().query, query);
        }
    }

    #[tokio::test]
    async fn test_unknown_ids_raise_not_found() {
        let service = service().await;
        assert!(matches!(service.edit_content("x", sql_edit("q")).await, Err(AppError::DraftNotFound(_))));
        assert!(matches!(service.execute_draft("x").await, Err(AppError::DraftNotFound(_))));
        assert!(matches!(service.crud_templates("t").await, Err(AppError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_title() {
        let service = service().await;
        let req = CreateDraftRequest {
            title: Some(String::new()),
            ..create(DraftKind::Sql)
        };
        assert!(matches!(service.create_draft(req).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_clears_current_and_pending_edits() {
        let service = service().await;
        let draft = service.create_draft(create(DraftKind::Sql)).await.unwrap();
        service.edit_content(&draft.id, sql_edit("SELECT 1")).await.unwrap();

        service.delete_draft(&draft.id).await.unwrap();
        assert!(service.current_draft().await.is_none());
        assert!(service.ctx.autosave.pending_content(&draft.id).await.is_none());
    }

    #[tokio::test]
    async fn test_draft_from_template() {
        let catalog = InMemoryTableCatalog::default();
        catalog
            .upsert(Table::new(
                "t-users",
                "users",
                vec![
                    TableColumn::new("id", "integer").with_constraint("PRIMARY KEY"),
                    TableColumn::new("name", "text"),
                ],
            ))
            .await;
        let catalog: Arc<dyn TableCatalog> = Arc::new(catalog);
        let mut ctx = test_context().await;
        ctx.catalog = catalog;
        let service = WorkbenchService::new(Arc::new(ctx));

        let draft = service
            .draft_from_template("t-users", CrudAction::Read, "conn-1".into())
            .await
            .unwrap();
        assert_eq!(draft.kind, DraftKind::Sql);
        assert_eq!(draft.title.as_deref(), Some("READ users"));
        assert_eq!(
            draft.decoded_content().sql_or_default().query,
            "SELECT * FROM users WHERE id = ?;"
        );
        assert_eq!(service.current_draft().await.unwrap().id, draft.id);
        assert_eq!(service.list_tables().await.len(), 1);
    }
}
