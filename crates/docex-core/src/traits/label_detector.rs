//! Label detection collaborator.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::DocexResult;
use crate::types::{DetectedLabel, Schema};

/// Request sent to the label detection service.
///
/// `labels` is the schema (field name to description); the service finds
/// the document snippets that act as labels for those fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDetectRequest {
    pub labels: Schema,
    pub text: String,
    pub top_k: usize,
    pub min_token_length: usize,
    pub similarity_threshold: f32,
}

/// Response from the label detection service. Missing members default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelDetectResponse {
    pub detected_labels: Vec<DetectedLabel>,
    pub labels_summary: IndexMap<String, String>,
    pub processing_time_ms: u64,
    pub total_candidates: usize,
    pub model_used: String,
}

/// Finds which schema fields appear as labels in a document's text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect_labels(&self, request: &LabelDetectRequest) -> DocexResult<LabelDetectResponse>;
}
