// src/api/http/router.rs
// HTTP router composition for REST API endpoints

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::{
    diagnosis::{chat_handler, diagnose_handler},
    handlers::health_handler,
    history::{create_history, history_stats, list_history},
};
use crate::state::AppState;

/// Version advertised in the `x-api-version` header
pub const API_VERSION: &str = "1";

/// Routes nested under /api
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Scan history
        .route("/history", get(list_history).post(create_history))
        .route("/stats", get(history_stats))
        // Diagnosis provider proxy
        .route("/diagnose", post(diagnose_handler))
        .route("/chat", post(chat_handler))
}

/// Complete application router with middleware
pub fn http_router(app_state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let version_header = SetResponseHeaderLayer::if_not_present(
        header::HeaderName::from_static("x-api-version"),
        HeaderValue::from_static(API_VERSION),
    );

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(version_header)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
