//! 请求/查询工作台服务
//!
//! 提供 REST 请求与 SQL 查询草稿的编辑与执行功能，包括：
//! - 草稿的增删改查与当前草稿切换
//! - 内容校验与防抖自动保存
//! - 草稿执行与结果格式化
//! - 基于表元数据的 CRUD 模板生成

mod autosave;
mod catalog;
mod context;
mod draft_store;
mod engine;
mod executor;
mod handlers;
mod repository;
mod routes;
mod service;
mod state;

use anyhow::Context as _;
use axum::{middleware, routing::get, Json, Router};
use common::config::AppConfig;
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "workbench-service";
const DEFAULT_PORT: u16 = 8083;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "工作台服务 API",
        version = "0.1.0",
        description = "REST 请求 / SQL 查询草稿编辑与执行微服务"
    ),
    paths(
        handlers::list_drafts,
        handlers::create_draft,
        handlers::current_draft,
        handlers::get_draft,
        handlers::update_draft,
        handlers::delete_draft,
        handlers::select_draft,
        handlers::edit_content,
        handlers::save_draft,
        handlers::validate_draft,
        handlers::execute_draft,
        handlers::current_result,
        handlers::clear_result,
        handlers::list_tables,
        handlers::crud_templates,
        handlers::draft_from_template,
        handlers::reset_workspace,
        handlers::health_check,
    ),
    components(schemas(
        common::models::Draft,
        common::models::DraftKind,
        common::models::DraftContent,
        common::models::RestRequest,
        common::models::SqlQuery,
        common::models::HttpMethod,
        common::models::CreateDraftRequest,
        common::models::UpdateDraftRequest,
        common::models::EditContentRequest,
        common::models::Warning,
        common::models::Severity,
        common::models::ValidationSummary,
        common::models::ExecutionResult,
        common::models::ExecutionStatus,
        common::models::ExecutionMetadata,
        common::models::ExecutionError,
        common::models::Table,
        common::models::TableColumn,
        common::models::TableRelationship,
        common::models::RelationshipType,
        common::models::ValidationRule,
        common::models::CrudAction,
        common::models::CrudTemplates,
        handlers::ExecutionResponse,
        handlers::CurrentResultResponse,
        handlers::TemplateDraftRequest,
        handlers::HealthResponse,
    )),
    tags(
        (name = "drafts", description = "草稿管理端点"),
        (name = "execution", description = "草稿执行端点"),
        (name = "tables", description = "表元数据与 CRUD 模板端点"),
        (name = "workspace", description = "工作区端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let mut config = AppConfig::load_with_service(SERVICE_NAME);
    config.port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    // 创建应用状态（草稿存储、执行器、表目录）
    let state = AppState::new(config.clone())
        .await
        .context("Failed to initialize application state (check DATABASE_URL / SQL_TARGET_URL / TABLES_FILE)")?;
    let workbench = state.workbench.clone();

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务启动失败")?;

    // 退出前保存所有待保存的编辑
    let flushed = workbench
        .autosave
        .flush_all()
        .await
        .context("退出前保存草稿失败")?;
    info!(flushed, "服务已停止");
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "无法监听退出信号");
        std::future::pending::<()>().await;
    }
    info!("收到退出信号，正在停止服务");
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let env_path = std::path::Path::new(".env");
    let Ok(content) = std::fs::read_to_string(env_path) else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            // Only set if not already set by the environment
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}
