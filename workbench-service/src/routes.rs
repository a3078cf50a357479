//! 路由模块

use axum::{
    routing::{get, post, put},
    Router,
};
use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/drafts", get(handlers::list_drafts).post(handlers::create_draft))
        .route("/api/drafts/current", get(handlers::current_draft))
        .route(
            "/api/drafts/{id}",
            get(handlers::get_draft)
                .patch(handlers::update_draft)
                .delete(handlers::delete_draft),
        )
        .route("/api/drafts/{id}/select", put(handlers::select_draft))
        .route("/api/drafts/{id}/content", put(handlers::edit_content))
        .route("/api/drafts/{id}/save", post(handlers::save_draft))
        .route("/api/drafts/{id}/validate", post(handlers::validate_draft))
        .route("/api/drafts/{id}/execute", post(handlers::execute_draft))
        .route(
            "/api/results/current",
            get(handlers::current_result).delete(handlers::clear_result),
        )
        .route("/api/tables", get(handlers::list_tables))
        .route("/api/tables/{id}/crud-templates", get(handlers::crud_templates))
        .route(
            "/api/tables/{id}/crud-templates/{action}",
            post(handlers::draft_from_template),
        )
        .route("/api/workspace/reset", post(handlers::reset_workspace))
        .route("/api/health", get(handlers::health_check))
}
