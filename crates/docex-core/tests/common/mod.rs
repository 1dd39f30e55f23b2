//! Counting collaborator stubs shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docex_core::{
    BatchItem, DetectedLabel, DocexError, DocexResult, ExtractionCache, ExtractorConfig,
    InMemoryCacheStore, ItemProcessor, LabelDetectRequest, LabelDetectResponse,
    LabelDetectionService, LabelDetector, Schema, SemanticExtractor, SemanticRequest,
    SemanticResponse, SequentialExtractor, TextExtractor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Answers from a fixed table and remembers every request.
#[derive(Default)]
pub struct StubSemantic {
    answers: HashMap<String, String>,
    requests: Mutex<Vec<SemanticRequest>>,
}

impl StubSemantic {
    pub fn new(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SemanticRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SemanticExtractor for StubSemantic {
    async fn smart_extract(&self, request: &SemanticRequest) -> DocexResult<SemanticResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mut response = SemanticResponse::default();
        for name in request.schema.names() {
            let value = self.answers.get(name).cloned();
            response.fields.insert(name.to_string(), value.into());
        }
        // Services sometimes answer for fields nobody asked about.
        response
            .fields
            .insert("unrequested".to_string(), Some("noise".to_string()).into());
        Ok(response)
    }
}

/// Returns canned text per payload; listed payloads fail as unreachable.
#[derive(Default)]
pub struct StubText {
    texts: HashMap<String, String>,
    unreachable: Vec<String>,
    calls: AtomicUsize,
}

impl StubText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, pdf: &[u8], text: &str) -> Self {
        self.texts.insert(encode(pdf), text.to_string());
        self
    }

    pub fn unreachable_for(mut self, pdf: &[u8]) -> Self {
        self.unreachable.push(encode(pdf));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for StubText {
    async fn extract_text(&self, pdf_base64: &str) -> DocexResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.iter().any(|p| p == pdf_base64) {
            return Err(DocexError::api("connection refused"));
        }
        self.texts
            .get(pdf_base64)
            .cloned()
            .ok_or_else(|| DocexError::text_extraction("no text for document"))
    }
}

/// Matches every schema field to a `"{field}:"` snippet.
#[derive(Default)]
pub struct StubLabels {
    requests: Mutex<Vec<LabelDetectRequest>>,
}

impl StubLabels {
    pub fn requests(&self) -> Vec<LabelDetectRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LabelDetector for StubLabels {
    async fn detect_labels(&self, request: &LabelDetectRequest) -> DocexResult<LabelDetectResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let detected_labels = request
            .labels
            .names()
            .enumerate()
            .map(|(i, name)| DetectedLabel {
                candidate_text: format!("{}:", name),
                matched_label: name.to_string(),
                score: 0.9,
                rank: i as u32 + 1,
            })
            .collect();
        Ok(LabelDetectResponse {
            detected_labels,
            total_candidates: request.labels.len(),
            model_used: "stub".to_string(),
            ..LabelDetectResponse::default()
        })
    }
}

pub fn encode(pdf: &[u8]) -> String {
    STANDARD.encode(pdf)
}

pub fn schema(pairs: &[(&str, &str)]) -> Schema {
    pairs.iter().copied().collect()
}

pub fn item(file_id: &str, pdf: &[u8], schema: Schema) -> BatchItem {
    BatchItem {
        file_id: file_id.to_string(),
        pdf_base64: encode(pdf),
        extraction_schema: schema,
        validation_data: Some(serde_json::json!({ "row": file_id })),
        pdf_filename: Some(format!("{}.pdf", file_id)),
        schema_hash: None,
    }
}

pub fn config() -> ExtractorConfig {
    let mut config = ExtractorConfig::default();
    config.cache.retry_delay_ms = 1;
    config
}

/// A processor wired to the stubs and a fresh in-memory store.
pub struct Harness {
    pub store: Arc<InMemoryCacheStore>,
    pub cache: Arc<ExtractionCache>,
    pub semantic: Arc<StubSemantic>,
    pub text: Arc<StubText>,
    pub processor: Arc<ItemProcessor>,
}

impl Harness {
    pub fn new(semantic: StubSemantic, text: StubText) -> Self {
        let config = config();
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = Arc::new(ExtractionCache::new(store.clone(), &config));
        let semantic = Arc::new(semantic);
        let text = Arc::new(text);
        let extractor = Arc::new(SequentialExtractor::new(
            semantic.clone(),
            config.extraction.clone(),
        ));
        let processor = Arc::new(ItemProcessor::new(cache.clone(), text.clone(), extractor));
        Self {
            store,
            cache,
            semantic,
            text,
            processor,
        }
    }

    /// Same wiring, with background label detection through `labels`.
    pub fn with_labels(semantic: StubSemantic, text: StubText, labels: Arc<StubLabels>) -> Self {
        let mut h = Self::new(semantic, text);
        let config = config();
        let service = Arc::new(LabelDetectionService::new(
            labels,
            h.text.clone(),
            h.cache.clone(),
            config.labels.clone(),
        ));
        let extractor = Arc::new(SequentialExtractor::new(
            h.semantic.clone(),
            config.extraction.clone(),
        ));
        h.processor = Arc::new(
            ItemProcessor::new(h.cache.clone(), h.text.clone(), extractor)
                .with_label_detection(service),
        );
        h
    }
}
