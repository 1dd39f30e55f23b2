//! Single-document extraction endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use docex_core::{BatchItem, CacheType, ExtractorResponse, Schema};

/// Request body for a single extraction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub label: String,
    pub pdf_base64: String,
    pub extraction_schema: Schema,
    #[serde(default)]
    pub pdf_filename: Option<String>,
}

/// Response for a single extraction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub data: ExtractorResponse,
    pub cache_type: CacheType,
    pub used_cache: bool,
    pub processing_time_ms: u64,
    pub pdf_hash: String,
    pub schema_hash: String,
}

/// Extract one document synchronously, through the same pipeline as batches.
/// POST /extract
pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> ApiResult<Json<ExtractResponse>> {
    if request.label.trim().is_empty() {
        return Err(ApiError::from(docex_core::DocexError::missing_field(
            "label",
            "label is required",
        )));
    }
    if request.extraction_schema.is_empty() {
        return Err(ApiError::from(docex_core::DocexError::missing_field(
            "extractionSchema",
            "extractionSchema must name at least one field",
        )));
    }

    let item = BatchItem {
        file_id: "single".to_string(),
        pdf_base64: request.pdf_base64,
        extraction_schema: request.extraction_schema,
        validation_data: None,
        pdf_filename: request.pdf_filename,
        schema_hash: None,
    };
    let outcome = state.processor().process(&request.label, &item).await?;

    Ok(Json(ExtractResponse {
        data: outcome.data,
        cache_type: outcome.cache_type,
        used_cache: outcome.cache_type.used_cache(),
        processing_time_ms: outcome.processing_time_ms,
        pdf_hash: outcome.pdf_hash,
        schema_hash: outcome.schema_hash,
    }))
}
