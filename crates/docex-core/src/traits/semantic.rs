//! Semantic/GPT fallback collaborator.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DocexResult;
use crate::types::Schema;

/// Request sent to the smart-extract service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticRequest {
    pub label: Option<String>,
    pub text: String,
    pub schema: Schema,
    pub confidence_threshold: f32,
    pub enable_gpt_fallback: bool,
}

/// Per-field detail some service versions return instead of a bare value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticFieldDetail {
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub method: Option<String>,
}

/// A field as returned by the service: a bare value or a detail object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SemanticField {
    Detailed(SemanticFieldDetail),
    Value(Option<String>),
}

impl SemanticField {
    pub fn value(&self) -> Option<&str> {
        match self {
            SemanticField::Detailed(detail) => detail.value.as_deref(),
            SemanticField::Value(value) => value.as_deref(),
        }
    }
}

impl From<Option<String>> for SemanticField {
    fn from(value: Option<String>) -> Self {
        SemanticField::Value(value)
    }
}

/// Response from the smart-extract service. Missing members default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticResponse {
    pub fields: IndexMap<String, SemanticField>,
    pub cache_hit: bool,
    pub avg_confidence: f32,
    pub methods_used: HashMap<String, u32>,
    pub gpt_fallback_used: bool,
    pub processing_time_ms: u64,
}

impl SemanticResponse {
    /// Non-blank value returned for a field.
    pub fn value_of(&self, field: &str) -> Option<String> {
        self.fields
            .get(field)
            .and_then(SemanticField::value)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Residual-text extraction backed by embeddings, NLI and GPT.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SemanticExtractor: Send + Sync {
    /// Resolve the request's schema against its text.
    async fn smart_extract(&self, request: &SemanticRequest) -> DocexResult<SemanticResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_accepts_bare_and_detailed_fields() {
        let response: SemanticResponse = serde_json::from_str(
            r#"{
                "fields": {
                    "nome": "Maria Silva",
                    "endereco": {"value": "Rua A, 10", "confidence": 0.82, "method": "embedding"},
                    "obs": null
                },
                "methods_used": {"embedding": 1}
            }"#,
        )
        .unwrap();

        assert_eq!(response.value_of("nome").as_deref(), Some("Maria Silva"));
        assert_eq!(response.value_of("endereco").as_deref(), Some("Rua A, 10"));
        assert_eq!(response.value_of("obs"), None);
        assert_eq!(response.value_of("missing"), None);
        assert!(!response.cache_hit);
        assert_eq!(response.methods_used["embedding"], 1);
    }

    #[test]
    fn test_request_wire_names() {
        let request = SemanticRequest {
            label: None,
            text: "x".to_string(),
            schema: Schema::new(),
            confidence_threshold: 0.7,
            enable_gpt_fallback: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["label"].is_null());
        assert_eq!(json["enable_gpt_fallback"], true);
        assert!(json.get("confidence_threshold").is_some());
    }
}
