//! Extraction Handlers
//!
//! One POST endpoint per intent. Bodies are read as raw bytes so a
//! malformed or mistyped payload maps to "Invalid JSON body" regardless of
//! the Content-Type the client sent.

use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use raidclaim_vision::Intent;

use crate::dto::{ExtractRequestBody, ExtractionResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Date and time only
pub async fn extract_date_time(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ExtractionResponse>> {
    extract(&state, Intent::DateTime, &body).await
}

/// Full receipt fields
pub async fn extract_receipt(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ExtractionResponse>> {
    extract(&state, Intent::StructuredReceipt, &body).await
}

/// All legible text
pub async fn extract_text(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ExtractionResponse>> {
    extract(&state, Intent::PlainText, &body).await
}

/// Anything but POST on an extraction route
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn extract(
    state: &AppState,
    intent: Intent,
    body: &[u8],
) -> ApiResult<Json<ExtractionResponse>> {
    let body: ExtractRequestBody = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        ApiError::InvalidJsonBody
    })?;

    tracing::debug!(
        %intent,
        file_name = body.file_name.as_deref().unwrap_or("-"),
        mime_type = body.mime_type.as_deref().unwrap_or("-"),
        image_len = body.image.as_ref().map(|i| i.len()).unwrap_or(0),
        "Extraction request received"
    );

    let request = body.into_request(intent)?;
    let outcome = state.gateway.handle(request).await?;

    Ok(Json(outcome.into()))
}
