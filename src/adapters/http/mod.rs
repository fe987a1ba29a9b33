pub mod error;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/detect", post(routes::detect))
        .route("/detect/annotated", post(routes::detect_annotated))
        .route("/download/:filename", get(routes::download))
        .route("/switch-model/:model_name", post(routes::switch_model))
        .route("/models", get(routes::list_models))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
