// src/api/http/history.rs
// Scan history endpoints: create, list, aggregate stats

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::ApiResult;
use crate::history::{CreateScanRequest, CreatedScan, ScanRecord, ScanStats};
use crate::state::AppState;

/// GET /api/history
pub async fn list_history(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ScanRecord>>> {
    let records = state.store.list().await?;
    debug!("Listing {} scan records", records.len());
    Ok(Json(records))
}

/// POST /api/history
pub async fn create_history(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateScanRequest>, JsonRejection>,
) -> ApiResult<Json<CreatedScan>> {
    let Json(request) = payload?;
    let scan = request.validate(state.validation)?;

    let id = state.store.create(&scan).await?;
    info!(
        "Recorded scan {} (plant: {:?}, disease: {:?})",
        id, scan.plant_name, scan.disease_name
    );

    Ok(Json(CreatedScan { id }))
}

/// GET /api/stats
pub async fn history_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<ScanStats>> {
    Ok(Json(state.store.stats().await?))
}
