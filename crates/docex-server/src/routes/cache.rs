//! Cache administration endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use docex_core::{decode_pdf_base64, CacheStats, Schema};

/// Request body for deleting a cached extraction.
///
/// The document is named by its content or by its hash.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCacheRequest {
    pub label: String,
    #[serde(default)]
    pub pdf_base64: Option<String>,
    #[serde(default)]
    pub pdf_hash: Option<String>,
    pub extraction_schema: Schema,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCacheResponse {
    pub deleted: bool,
    pub cache_key: String,
}

/// Delete one cached extraction.
/// DELETE /cache
pub async fn delete_cache_entry(
    State(state): State<AppState>,
    Json(request): Json<DeleteCacheRequest>,
) -> ApiResult<Json<DeleteCacheResponse>> {
    let cache = state.cache();
    let pdf_hash = match (request.pdf_hash, request.pdf_base64) {
        (Some(hash), _) if !hash.trim().is_empty() => hash.trim().to_string(),
        (_, Some(raw)) => cache.pdf_hash(&decode_pdf_base64("cache", &raw)?),
        _ => return Err(ApiError::bad_request("Either pdfHash or pdfBase64 is required")),
    };

    let cache_key = cache.cache_key(&request.label, &pdf_hash, &request.extraction_schema);
    let deleted = cache
        .delete(&request.label, &pdf_hash, &request.extraction_schema)
        .await;
    info!(key = %cache_key, deleted, "Cache entry delete requested");

    Ok(Json(DeleteCacheResponse { deleted, cache_key }))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// `YYYY-MM-DD`; today (UTC) when absent.
    pub date: Option<String>,
}

/// Daily cache metrics.
/// GET /cache/stats
pub async fn cache_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<CacheStats>> {
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))?,
        None => Utc::now().date_naive(),
    };
    Ok(Json(state.cache().daily_stats(date).await))
}
