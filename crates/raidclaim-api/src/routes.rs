//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Create API v1 routes
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/extract", extract_routes())
        .route("/providers", get(handlers::providers::list_providers))
}

/// Extraction routes, POST only
fn extract_routes() -> Router<Arc<AppState>> {
    use handlers::extract::*;

    Router::new()
        .route(
            "/datetime",
            post(extract_date_time).fallback(method_not_allowed),
        )
        .route(
            "/receipt",
            post(extract_receipt).fallback(method_not_allowed),
        )
        .route("/text", post(extract_text).fallback(method_not_allowed))
}
