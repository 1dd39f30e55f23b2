//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache: CacheHealth,
    pub history_enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHealth {
    pub backend: String,
    pub available: bool,
    pub breaker_open: bool,
    pub consecutive_failures: u32,
}

/// Health check endpoint.
/// GET /health
///
/// The server keeps answering without its cache, so an unreachable store
/// reports `degraded` rather than failing the check.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let store = state.cache().store();
    let breaker = store.breaker();
    let available = state.cache().is_available().await;

    Ok(Json(HealthResponse {
        status: if available { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: CacheHealth {
            backend: store.inner().name().to_string(),
            available,
            breaker_open: breaker.is_open(),
            consecutive_failures: breaker.consecutive_failures(),
        },
        history_enabled: state.history().is_some(),
    }))
}
