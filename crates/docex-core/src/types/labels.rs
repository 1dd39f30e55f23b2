//! Labels detected in a document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schema::Schema;

/// A document snippet matched to a schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLabel {
    /// Text of the document that acts as the label, e.g. `"Nome Completo:"`.
    pub candidate_text: String,
    /// Schema field it was matched to.
    pub matched_label: String,
    pub score: f32,
    pub rank: u32,
}

/// Cached label detection for one (label, document, schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLabels {
    pub label: String,
    pub pdf_hash: String,
    pub schema_hash: String,
    pub schema: Schema,
    pub detected_labels: Vec<DetectedLabel>,
    pub total_candidates: usize,
    pub model_used: String,
    pub processing_time_ms: u64,
    pub detected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_as_json() {
        let record = DetectedLabels {
            label: "cnh".to_string(),
            pdf_hash: "p".to_string(),
            schema_hash: "s".to_string(),
            schema: [("nome", "Nome")].into_iter().collect(),
            detected_labels: vec![DetectedLabel {
                candidate_text: "Nome:".to_string(),
                matched_label: "nome".to_string(),
                score: 0.9,
                rank: 1,
            }],
            total_candidates: 4,
            model_used: "mpnet".to_string(),
            processing_time_ms: 12,
            detected_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""candidate_text":"Nome:""#));
        assert_eq!(serde_json::from_str::<DetectedLabels>(&json).unwrap(), record);
    }
}
