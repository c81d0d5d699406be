// src/api/http/handlers.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;

/// Health check handler
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = state.store.ping().await;
    let schema_version = state.store.schema_version().await.ok();

    let (status_code, status) = match &database {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            warn!("Health check: database unavailable: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "schema_version": schema_version,
            "diagnosis_provider": state.provider.as_ref().map(|p| p.name()),
            "timestamp": Utc::now().to_rfc3339()
        })),
    )
}
