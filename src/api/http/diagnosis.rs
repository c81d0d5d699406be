// src/api/http/diagnosis.rs
// Proxy endpoints for the diagnosis provider

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::api::error::{invalid_param_error, ApiError, ApiResult};
use crate::diagnosis::{Diagnosis, DiagnosisProvider, ImagePayload};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnoseRequest {
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

fn provider(state: &AppState) -> ApiResult<&Arc<dyn DiagnosisProvider>> {
    state
        .provider
        .as_ref()
        .ok_or_else(|| ApiError::provider_unavailable("No diagnosis provider configured (set GEMINI_API_KEY)"))
}

/// POST /api/diagnose
pub async fn diagnose_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DiagnoseRequest>, JsonRejection>,
) -> ApiResult<Json<Diagnosis>> {
    let provider = provider(&state)?;
    let Json(request) = payload?;
    let image = ImagePayload::parse(&request.image)?;

    let diagnosis = provider.diagnose(&image).await?;
    info!(
        "{} diagnosed {} / {} ({:.1}%)",
        provider.name(),
        diagnosis.plant_name,
        diagnosis.disease_name,
        diagnosis.confidence
    );

    Ok(Json(diagnosis))
}

/// POST /api/chat
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let provider = provider(&state)?;
    let Json(request) = payload?;
    if request.message.trim().is_empty() {
        return Err(invalid_param_error("message", "must not be empty"));
    }

    let reply = provider.chat(&request.message).await?;
    Ok(Json(ChatResponse { reply }))
}
