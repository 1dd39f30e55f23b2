//! Per-document pipeline: cache lookup, residual extraction, save.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::background::spawn_best_effort;
use crate::cache::{remove_known_values, ExtractionCache, SaveMeta};
use crate::error::{DocexError, DocexResult};
use crate::extraction::SequentialExtractor;
use crate::labels::{LabelDetectionService, LabelTarget};
use crate::traits::TextExtractor;
use crate::types::{is_present, BatchItem, CacheType, ExtractorResponse, StrategiesUsed};

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub data: ExtractorResponse,
    pub cache_type: CacheType,
    pub pdf_hash: String,
    /// Caller-supplied schema hash when given, else the computed one.
    pub schema_hash: String,
    pub pdf_size_bytes: u64,
    pub strategies: StrategiesUsed,
    pub processing_time_ms: u64,
}

/// Runs the cache-aware extraction pipeline for single documents.
pub struct ItemProcessor {
    cache: Arc<ExtractionCache>,
    text: Arc<dyn TextExtractor>,
    extractor: Arc<SequentialExtractor>,
    labels: Option<Arc<LabelDetectionService>>,
}

impl ItemProcessor {
    pub fn new(
        cache: Arc<ExtractionCache>,
        text: Arc<dyn TextExtractor>,
        extractor: Arc<SequentialExtractor>,
    ) -> Self {
        Self {
            cache,
            text,
            extractor,
            labels: None,
        }
    }

    /// Also detect each document's labels in the background.
    pub fn with_label_detection(mut self, labels: Arc<LabelDetectionService>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn cache(&self) -> &Arc<ExtractionCache> {
        &self.cache
    }

    /// Decode an item's base64 payload. Data-URL prefixes are accepted.
    pub fn decode_pdf(item: &BatchItem) -> DocexResult<Vec<u8>> {
        decode_pdf_base64(&item.file_id, &item.pdf_base64)
    }

    /// Hash of an item's document, when its payload decodes.
    pub fn pdf_hash_of(&self, item: &BatchItem) -> Option<String> {
        Self::decode_pdf(item).ok().map(|bytes| self.cache.pdf_hash(&bytes))
    }

    /// Process one document under `label`.
    ///
    /// Tries an exact cache hit first, then values known from earlier
    /// extractions of the same document. Only the fields still missing are
    /// extracted, over the document text with every known value removed.
    /// Label detection, when configured, runs detached and never affects
    /// the outcome.
    pub async fn process(&self, label: &str, item: &BatchItem) -> DocexResult<ItemOutcome> {
        let started = Instant::now();
        let schema = &item.extraction_schema;
        let pdf = Self::decode_pdf(item)?;
        let pdf_hash = self.cache.pdf_hash(&pdf);
        let schema_hash = item
            .schema_hash
            .clone()
            .unwrap_or_else(|| self.cache.schema_hash(schema));
        let pdf_size_bytes = pdf.len() as u64;

        let outcome = |data: ExtractorResponse, cache_type: CacheType, strategies: StrategiesUsed| {
            ItemOutcome {
                data,
                cache_type,
                pdf_hash: pdf_hash.clone(),
                schema_hash: schema_hash.clone(),
                pdf_size_bytes,
                strategies,
                processing_time_ms: started.elapsed().as_millis() as u64,
            }
        };

        if let Some(labels) = &self.labels {
            let labels = labels.clone();
            let target = LabelTarget {
                label: label.to_string(),
                pdf_hash: pdf_hash.clone(),
                schema_hash: schema_hash.clone(),
                schema: schema.clone(),
                pdf_base64: base64_payload(&item.pdf_base64).to_string(),
            };
            spawn_best_effort("label-detection", async move { labels.detect(&target).await });
        }

        if let Some(hit) = self.cache.get(label, &pdf_hash, schema).await {
            let cached = hit.result.values().filter(|v| is_present(v)).count();
            let strategies = StrategiesUsed {
                cache: cached,
                extracted: 0,
                cache_type: CacheType::Exact,
            };
            return Ok(outcome(hit.result, CacheType::Exact, strategies));
        }

        let prior = self.cache.prior(&pdf_hash).await;
        let needed = prior.known.fields_needed(schema);
        let from_cache = prior.known.count_known(schema);
        debug!(
            file_id = %item.file_id,
            prior_records = prior.records,
            known = from_cache,
            needed = needed.len(),
            "Resolved prior values"
        );

        if needed.is_empty() {
            let data = prior.known.to_response(schema);
            let strategies = StrategiesUsed {
                cache: from_cache,
                extracted: 0,
                cache_type: CacheType::PartialComplete,
            };
            let meta = SaveMeta {
                extracted_text: prior.text,
                pdf_size_bytes,
                processing_time_ms: started.elapsed().as_millis() as u64,
                strategies: Some(strategies),
                ..SaveMeta::default()
            };
            self.cache.save(label, &pdf_hash, schema, &data, meta).await;
            info!(file_id = %item.file_id, "All fields known from earlier extractions");
            return Ok(outcome(data, CacheType::PartialComplete, strategies));
        }

        let text = match prior.text {
            Some(text) => text,
            None => self.text.extract_text(base64_payload(&item.pdf_base64)).await?,
        };
        let residual = if prior.known.is_empty() {
            text.clone()
        } else {
            remove_known_values(&text, &prior.known)
        };

        let pending = schema.subset(&needed);
        let fresh = self.extractor.extract(label, &pending, &residual).await?;
        let data = prior.known.merge(schema, &fresh);

        let extracted = fresh.values().filter(|v| is_present(v)).count();
        let cache_type = if from_cache > 0 {
            CacheType::PartialHybrid
        } else {
            CacheType::None
        };
        let strategies = StrategiesUsed {
            cache: from_cache,
            extracted,
            cache_type,
        };
        let meta = SaveMeta {
            extracted_text: Some(text),
            pdf_size_bytes,
            processing_time_ms: started.elapsed().as_millis() as u64,
            strategies: Some(strategies),
            ..SaveMeta::default()
        };
        self.cache.save(label, &pdf_hash, schema, &data, meta).await;

        info!(
            file_id = %item.file_id,
            cache_type = %cache_type,
            from_cache,
            extracted,
            "Item extracted"
        );
        Ok(outcome(data, cache_type, strategies))
    }
}

/// Decode a plain or data-URL base64 document for the item `file_id`.
pub fn decode_pdf_base64(file_id: &str, raw: &str) -> DocexResult<Vec<u8>> {
    let payload = base64_payload(raw);
    if payload.is_empty() {
        return Err(DocexError::validation(format!(
            "Item {} has no PDF content",
            file_id
        )));
    }
    STANDARD.decode(payload).map_err(|e| {
        DocexError::invalid_format(format!(
            "Item {} has invalid base64 content: {}",
            file_id, e
        ))
    })
}

/// The base64 part of a plain or `data:...;base64,` payload.
fn base64_payload(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => raw,
    }
}
