//! Label detection cached alongside extractions.
//!
//! For each processed document the detection service is asked which text
//! snippets act as labels for the schema's fields. Results live at
//! `labels:{label}:{pdfHash}:{schemaHash}` and are indexed per label in the
//! set `labels:by_label:{label}` (members are `{pdfHash}:{schemaHash}`).

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::ExtractionCache;
use crate::config::LabelDetectionOptions;
use crate::error::{DocexError, DocexResult};
use crate::traits::{LabelDetectRequest, LabelDetector, TextExtractor};
use crate::types::{DetectedLabels, Schema};

fn record_key(label: &str, pdf_hash: &str, schema_hash: &str) -> String {
    format!("labels:{}:{}:{}", label, pdf_hash, schema_hash)
}

fn label_index(label: &str) -> String {
    format!("labels:by_label:{}", label)
}

/// Document whose labels are wanted.
#[derive(Debug, Clone)]
pub struct LabelTarget {
    pub label: String,
    pub pdf_hash: String,
    pub schema_hash: String,
    pub schema: Schema,
    /// Base64 payload, used only when no cached text exists.
    pub pdf_base64: String,
}

/// Detects and caches the labels of documents.
pub struct LabelDetectionService {
    detector: Arc<dyn LabelDetector>,
    text: Arc<dyn TextExtractor>,
    cache: Arc<ExtractionCache>,
    options: LabelDetectionOptions,
}

impl LabelDetectionService {
    pub fn new(
        detector: Arc<dyn LabelDetector>,
        text: Arc<dyn TextExtractor>,
        cache: Arc<ExtractionCache>,
        options: LabelDetectionOptions,
    ) -> Self {
        Self {
            detector,
            text,
            cache,
            options,
        }
    }

    pub async fn get(&self, label: &str, pdf_hash: &str, schema_hash: &str) -> Option<DetectedLabels> {
        let key = record_key(label, pdf_hash, schema_hash);
        let raw = self.cache.store().get(&key).await?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable label detection");
                None
            }
        }
    }

    /// `{pdfHash}:{schemaHash}` of every detection cached under `label`.
    pub async fn detected_for_label(&self, label: &str) -> Vec<String> {
        self.cache.store().set_members(&label_index(label)).await
    }

    /// Detect the labels of `target`, reusing a cached detection.
    ///
    /// Text comes from an earlier extraction of the same document when one
    /// stored it, else from the text extraction service.
    pub async fn detect(&self, target: &LabelTarget) -> DocexResult<DetectedLabels> {
        if let Some(cached) = self
            .get(&target.label, &target.pdf_hash, &target.schema_hash)
            .await
        {
            debug!(label = %target.label, pdf_hash = %target.pdf_hash, "Label detection cache hit");
            return Ok(cached);
        }

        let started = Instant::now();
        let text = match self.cache.cached_text(&target.pdf_hash).await {
            Some(text) => text,
            None => self.text.extract_text(&target.pdf_base64).await?,
        };
        if text.trim().is_empty() {
            return Err(DocexError::text_extraction(format!(
                "No text to detect labels in for document {}",
                target.pdf_hash
            )));
        }

        let request = LabelDetectRequest {
            labels: target.schema.clone(),
            text,
            top_k: self.options.top_k,
            min_token_length: self.options.min_token_length,
            similarity_threshold: self.options.similarity_threshold,
        };
        let response = self.detector.detect_labels(&request).await?;

        let record = DetectedLabels {
            label: target.label.clone(),
            pdf_hash: target.pdf_hash.clone(),
            schema_hash: target.schema_hash.clone(),
            schema: target.schema.clone(),
            detected_labels: response.detected_labels,
            total_candidates: response.total_candidates,
            model_used: response.model_used,
            processing_time_ms: started.elapsed().as_millis() as u64,
            detected_at: Utc::now(),
        };
        self.save(&record).await?;

        info!(
            label = %record.label,
            pdf_hash = %record.pdf_hash,
            detected = record.detected_labels.len(),
            "Labels detected"
        );
        Ok(record)
    }

    async fn save(&self, record: &DetectedLabels) -> DocexResult<()> {
        let key = record_key(&record.label, &record.pdf_hash, &record.schema_hash);
        let json = serde_json::to_string(record)?;
        let store = self.cache.store();
        if !store.set(&key, &json, Some(self.options.ttl())).await {
            return Err(DocexError::cache_store(format!(
                "Failed to write label detection {}",
                key
            )));
        }
        let index = label_index(&record.label);
        let member = format!("{}:{}", record.pdf_hash, record.schema_hash);
        store.set_add(&index, &member).await;
        store.expire(&index, self.options.ttl()).await;
        Ok(())
    }
}
