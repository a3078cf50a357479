//! Handler模块

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use common::errors::AppError;
use common::middleware::RequestId;
use common::models::{
    CreateDraftRequest, CrudAction, CrudTemplates, Draft, EditContentRequest, ExecutionResult,
    Table, UpdateDraftRequest, ValidationSummary,
};
use common::response::ApiResponse;
use crate::engine::Execution;
use crate::service::WorkbenchService;
use crate::state::AppState;

const SERVICE_NAME: &str = "workbench-service";

fn service(state: &AppState) -> WorkbenchService {
    WorkbenchService::new(state.workbench.clone())
}

/// 列出所有草稿（按更新时间倒序）
#[utoipa::path(
    get,
    path = "/api/drafts",
    tag = "drafts",
    responses(
        (status = 200, description = "草稿列表", body = ApiResponse<Vec<Draft>>)
    )
)]
pub async fn list_drafts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Draft>>>, AppError> {
    let data = service(&state).list_drafts().await;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 创建草稿，新草稿成为当前草稿
#[utoipa::path(
    post,
    path = "/api/drafts",
    tag = "drafts",
    request_body = CreateDraftRequest,
    responses(
        (status = 201, description = "草稿已创建", body = ApiResponse<Draft>),
        (status = 400, description = "请求参数无效")
    )
)]
pub async fn create_draft(
    State(state): State<AppState>,
    Json(req): Json<CreateDraftRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Draft>>), AppError> {
    let data = service(&state).create_draft(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_service(data, SERVICE_NAME)),
    ))
}

/// 获取当前草稿
#[utoipa::path(
    get,
    path = "/api/drafts/current",
    tag = "drafts",
    responses(
        (status = 200, description = "当前草稿（无当前草稿时 data 为 null）", body = ApiResponse<Draft>)
    )
)]
pub async fn current_draft(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<Draft>>>, AppError> {
    let data = service(&state).current_draft().await;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 根据 ID 获取草稿
#[utoipa::path(
    get,
    path = "/api/drafts/{id}",
    tag = "drafts",
    params(
        ("id" = String, Path, description = "草稿 ID")
    ),
    responses(
        (status = 200, description = "草稿详情", body = ApiResponse<Draft>),
        (status = 404, description = "草稿未找到")
    )
)]
pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Draft>>, AppError> {
    let data = service(&state).get_draft(&id).await?;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 更新草稿（类型、标题、连接或内容）
#[utoipa::path(
    patch,
    path = "/api/drafts/{id}",
    tag = "drafts",
    params(
        ("id" = String, Path, description = "草稿 ID")
    ),
    request_body = UpdateDraftRequest,
    responses(
        (status = 200, description = "草稿已更新", body = ApiResponse<Draft>),
        (status = 400, description = "请求参数无效"),
        (status = 404, description = "草稿未找到")
    )
)]
pub async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDraftRequest>,
) -> Result<Json<ApiResponse<Draft>>, AppError> {
    let data = service(&state).update_draft(&id, req).await?;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 删除草稿
#[utoipa::path(
    delete,
    path = "/api/drafts/{id}",
    tag = "drafts",
    params(
        ("id" = String, Path, description = "草稿 ID")
    ),
    responses(
        (status = 200, description = "草稿已删除", body = ApiResponse<bool>),
        (status = 404, description = "草稿未找到")
    )
)]
pub async fn delete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    service(&state).delete_draft(&id).await?;
    Ok(Json(ApiResponse::ok_with_service(true, SERVICE_NAME)))
}

/// 设为当前草稿
#[utoipa::path(
    put,
    path = "/api/drafts/{id}/select",
    tag = "drafts",
    params(
        ("id" = String, Path, description = "草稿 ID")
    ),
    responses(
        (status = 200, description = "已切换当前草稿", body = ApiResponse<Draft>),
        (status = 404, description = "草稿未找到")
    )
)]
pub async fn select_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Draft>>, AppError> {
    let data = service(&state).select_draft(&id).await?;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 编辑草稿内容（防抖自动保存），返回即时校验结果
#[utoipa::path(
    put,
    path = "/api/drafts/{id}/content",
    tag = "drafts",
    params(
        ("id" = String, Path, description = "草稿 ID")
    ),
    request_body = EditContentRequest,
    responses(
        (status = 202, description = "编辑已接收，等待自动保存", body = ApiResponse<ValidationSummary>),
        (status = 404, description = "草稿未找到")
    )
)]
pub async fn edit_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EditContentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ValidationSummary>>), AppError> {
    let data = service(&state).edit_content(&id, req).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok_with_service(data, SERVICE_NAME)),
    ))
}

/// 立即保存待保存的编辑
#[utoipa::path(
    post,
    path = "/api/drafts/{id}/save",
    tag = "drafts",
    params(
        ("id" = String, Path, description = "草稿 ID")
    ),
    responses(
        (status = 200, description = "草稿已保存", body = ApiResponse<Draft>),
        (status = 404, description = "草稿未找到")
    )
)]
pub async fn save_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Draft>>, AppError> {
    let data = service(&state).save_draft(&id).await?;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 校验草稿
#[utoipa::path(
    post,
    path = "/api/drafts/{id}/validate",
    tag = "drafts",
    params(
        ("id" = String, Path, description = "草稿 ID")
    ),
    responses(
        (status = 200, description = "校验结果", body = ApiResponse<ValidationSummary>),
        (status = 404, description = "草稿未找到")
    )
)]
pub async fn validate_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ValidationSummary>>, AppError> {
    let data = service(&state).validate_draft(&id).await?;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 执行草稿；存在校验错误时拒绝执行
#[utoipa::path(
    post,
    path = "/api/drafts/{id}/execute",
    tag = "execution",
    params(
        ("id" = String, Path, description = "草稿 ID")
    ),
    responses(
        (status = 200, description = "执行完成（结果状态可能为 error）", body = ApiResponse<ExecutionResponse>),
        (status = 422, description = "校验未通过，未执行", body = ApiResponse<ExecutionResponse>),
        (status = 404, description = "草稿未找到")
    )
)]
pub async fn execute_draft(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<ExecutionResponse>>), AppError> {
    let (status, body) = match service(&state).execute_draft(&id).await? {
        Execution::Completed(result) => {
            let duration = result.duration;
            (
                StatusCode::OK,
                ApiResponse::ok(ExecutionResponse::completed(result)).with_duration(duration),
            )
        }
        Execution::Rejected(report) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiResponse::failed_with(
                ExecutionResponse::rejected(report.summary()),
                "VALIDATION_FAILED",
                "Draft has validation errors",
            ),
        ),
    };
    Ok((
        status,
        Json(body.with_service(SERVICE_NAME).with_request_id(request_id.as_str())),
    ))
}

/// 获取当前执行结果
#[utoipa::path(
    get,
    path = "/api/results/current",
    tag = "execution",
    responses(
        (status = 200, description = "当前执行结果", body = ApiResponse<CurrentResultResponse>)
    )
)]
pub async fn current_result(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CurrentResultResponse>>, AppError> {
    let service = service(&state);
    let data = CurrentResultResponse {
        result: service.current_result().await,
        is_loading: service.is_loading().await,
    };
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 清除当前执行结果
#[utoipa::path(
    delete,
    path = "/api/results/current",
    tag = "execution",
    responses(
        (status = 200, description = "结果已清除", body = ApiResponse<bool>)
    )
)]
pub async fn clear_result(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    service(&state).clear_result().await;
    Ok(Json(ApiResponse::ok_with_service(true, SERVICE_NAME)))
}

/// 列出表元数据
#[utoipa::path(
    get,
    path = "/api/tables",
    tag = "tables",
    responses(
        (status = 200, description = "表列表", body = ApiResponse<Vec<Table>>)
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Table>>>, AppError> {
    let data = service(&state).list_tables().await;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 生成表的 CRUD 模板
#[utoipa::path(
    get,
    path = "/api/tables/{id}/crud-templates",
    tag = "tables",
    params(
        ("id" = String, Path, description = "表 ID")
    ),
    responses(
        (status = 200, description = "CRUD 模板", body = ApiResponse<CrudTemplates>),
        (status = 404, description = "表未找到")
    )
)]
pub async fn crud_templates(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CrudTemplates>>, AppError> {
    let data = service(&state).crud_templates(&id).await?;
    Ok(Json(ApiResponse::ok_with_service(data, SERVICE_NAME)))
}

/// 以 CRUD 模板创建 SQL 草稿
#[utoipa::path(
    post,
    path = "/api/tables/{id}/crud-templates/{action}",
    tag = "tables",
    params(
        ("id" = String, Path, description = "表 ID"),
        ("action" = String, Path, description = "create / read / update / delete")
    ),
    request_body = TemplateDraftRequest,
    responses(
        (status = 201, description = "草稿已创建", body = ApiResponse<Draft>),
        (status = 400, description = "未知的 CRUD 操作"),
        (status = 404, description = "表未找到")
    )
)]
pub async fn draft_from_template(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
    Json(req): Json<TemplateDraftRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Draft>>), AppError> {
    let action: CrudAction = action.parse().map_err(AppError::Validation)?;
    let data = service(&state)
        .draft_from_template(&id, action, req.connection_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_service(data, SERVICE_NAME)),
    ))
}

/// 重置工作区：保存待保存编辑，清除当前草稿与结果
#[utoipa::path(
    post,
    path = "/api/workspace/reset",
    tag = "workspace",
    responses(
        (status = 200, description = "工作区已重置", body = ApiResponse<bool>)
    )
)]
pub async fn reset_workspace(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<bool>>, AppError> {
    service(&state).reset_workspace().await?;
    Ok(Json(ApiResponse::ok_with_service(true, SERVICE_NAME)))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        drafts: state.workbench.store.len().await,
    })
}

/// 执行响应
#[derive(Serialize, ToSchema)]
pub struct ExecutionResponse {
    /// 是否调用了执行器
    pub executed: bool,
    /// 执行结果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// 阻止执行的校验结果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSummary>,
}

impl ExecutionResponse {
    fn completed(result: ExecutionResult) -> Self {
        Self {
            executed: true,
            result: Some(result),
            validation: None,
        }
    }

    fn rejected(validation: ValidationSummary) -> Self {
        Self {
            executed: false,
            result: None,
            validation: Some(validation),
        }
    }
}

/// 当前执行结果
#[derive(Serialize, ToSchema)]
pub struct CurrentResultResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// 是否有执行仍在进行
    pub is_loading: bool,
}

/// 模板草稿请求
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TemplateDraftRequest {
    /// 草稿关联的连接 ID
    #[serde(default)]
    pub connection_id: String,
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 草稿数量
    pub drafts: usize,
}
