//! Extraction cache: exact lookups, prior values per document and saves.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::hashing;
use super::metrics::{CacheMetrics, CacheStats};
use super::residual::KnownValues;
use super::resilience::ResilientStore;
use crate::config::ExtractorConfig;
use crate::traits::CacheStore;
use crate::types::{
    is_present, CachedExtraction, ExtractorResponse, Schema, StrategiesUsed, CACHE_VERSION,
};

/// Bookkeeping stored alongside a result.
#[derive(Debug, Clone, Default)]
pub struct SaveMeta {
    pub extracted_text: Option<String>,
    pub pdf_size_bytes: u64,
    pub processing_time_ms: u64,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub strategies: Option<StrategiesUsed>,
}

/// What earlier extractions of one document left behind.
#[derive(Debug, Clone, Default)]
pub struct PriorExtractions {
    pub known: KnownValues,
    pub text: Option<String>,
    pub records: usize,
}

pub struct ExtractionCache {
    store: Arc<ResilientStore>,
    metrics: CacheMetrics,
    ttl: Duration,
    truncate: usize,
}

impl ExtractionCache {
    pub fn new(backend: Arc<dyn CacheStore>, config: &ExtractorConfig) -> Self {
        let store = Arc::new(ResilientStore::new(backend, &config.cache));
        Self::with_store(store, config)
    }

    /// Share an existing resilient store (and its breaker).
    pub fn with_store(store: Arc<ResilientStore>, config: &ExtractorConfig) -> Self {
        Self {
            metrics: CacheMetrics::new(store.clone(), config.cache.metrics_ttl()),
            store,
            ttl: config.cache.default_ttl(),
            truncate: config.hashing.truncate_length,
        }
    }

    pub fn store(&self) -> &Arc<ResilientStore> {
        &self.store
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn pdf_hash(&self, pdf_bytes: &[u8]) -> String {
        hashing::pdf_hash(pdf_bytes, self.truncate)
    }

    pub fn schema_hash(&self, schema: &Schema) -> String {
        hashing::schema_hash(schema, self.truncate)
    }

    pub fn cache_key(&self, label: &str, pdf_hash: &str, schema: &Schema) -> String {
        hashing::cache_key(label, pdf_hash, &self.schema_hash(schema))
    }

    /// Read and decode one record. Undecodable records are deleted.
    async fn load(&self, key: &str) -> Option<CachedExtraction> {
        let fields = self.store.hash_get_all(key).await;
        if fields.is_empty() {
            return None;
        }
        match CachedExtraction::from_hash_fields(&fields) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key, error = %e, "Corrupted cache record, deleting");
                self.store.delete(key).await;
                None
            }
        }
    }

    /// Exact lookup on (label, pdf, schema). Counts a hit or a miss.
    pub async fn get(&self, label: &str, pdf_hash: &str, schema: &Schema) -> Option<CachedExtraction> {
        let key = self.cache_key(label, pdf_hash, schema);
        match self.load(&key).await {
            Some(record) => {
                info!(label, pdf_hash, "Cache hit");
                self.metrics
                    .record_hit(record.processing_time_ms, record.cost_usd)
                    .await;
                Some(record)
            }
            None => {
                debug!(label, pdf_hash, "Cache miss");
                self.metrics.record_miss().await;
                None
            }
        }
    }

    /// Store a result under (label, pdf, schema) with the default TTL.
    pub async fn save(
        &self,
        label: &str,
        pdf_hash: &str,
        schema: &Schema,
        result: &ExtractorResponse,
        meta: SaveMeta,
    ) -> bool {
        let fields_total = schema.len();
        let fields_extracted = result.values().filter(|v| is_present(v)).count();
        let record = CachedExtraction {
            result: result.clone(),
            label: label.to_string(),
            pdf_hash: pdf_hash.to_string(),
            extracted_text: meta.extracted_text,
            pdf_size_bytes: meta.pdf_size_bytes,
            extracted_at: Utc::now(),
            processing_time_ms: meta.processing_time_ms,
            tokens_used: meta.tokens_used,
            cost_usd: meta.cost_usd,
            fields_total,
            fields_extracted,
            success_rate: if fields_total == 0 {
                0.0
            } else {
                fields_extracted as f64 / fields_total as f64
            },
            strategies_used: meta.strategies,
            cache_version: CACHE_VERSION.to_string(),
        };

        let fields = match record.to_hash_fields() {
            Ok(fields) => fields,
            Err(e) => {
                warn!(label, error = %e, "Failed to encode cache record");
                return false;
            }
        };
        let key = self.cache_key(label, pdf_hash, schema);
        let saved = self.store.hash_set_all(&key, &fields, Some(self.ttl)).await;
        if saved {
            debug!(key = %key, fields_extracted, fields_total, "Saved extraction");
        }
        saved
    }

    pub async fn delete(&self, label: &str, pdf_hash: &str, schema: &Schema) -> bool {
        let key = self.cache_key(label, pdf_hash, schema);
        self.store.delete(&key).await
    }

    /// Every decodable record for a document, oldest first.
    pub async fn all_for_pdf(&self, pdf_hash: &str) -> Vec<CachedExtraction> {
        let keys = self
            .store
            .scan_keys(&hashing::pdf_scan_pattern(pdf_hash))
            .await;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.load(&key).await {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.extracted_at);
        records
    }

    /// Known values and cached text from every earlier extraction of a document.
    pub async fn prior(&self, pdf_hash: &str) -> PriorExtractions {
        let records = self.all_for_pdf(pdf_hash).await;
        let mut known = KnownValues::new();
        for record in &records {
            known.absorb(&record.result);
        }
        let text = records
            .iter()
            .find_map(|r| r.extracted_text.clone().filter(|t| !t.trim().is_empty()));
        PriorExtractions {
            known,
            text,
            records: records.len(),
        }
    }

    /// Field values from earlier extractions, first non-null wins.
    pub async fn previously_extracted(&self, pdf_hash: &str) -> KnownValues {
        self.prior(pdf_hash).await.known
    }

    /// Raw text stored by any earlier extraction of a document.
    pub async fn cached_text(&self, pdf_hash: &str) -> Option<String> {
        self.prior(pdf_hash).await.text
    }

    pub async fn daily_stats(&self, date: NaiveDate) -> CacheStats {
        self.metrics.daily(date).await
    }

    /// Whether cache calls currently go through.
    pub async fn is_available(&self) -> bool {
        !self.store.breaker().is_open() && self.store.is_available().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCacheStore;
    use crate::types::CacheType;

    fn schema(pairs: &[(&str, &str)]) -> Schema {
        pairs.iter().copied().collect()
    }

    fn response(pairs: &[(&str, Option<&str>)]) -> ExtractorResponse {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    fn cache() -> (Arc<InMemoryCacheStore>, ExtractionCache) {
        let backend = Arc::new(InMemoryCacheStore::new());
        let mut config = ExtractorConfig::default();
        config.cache.retry_delay_ms = 1;
        let cache = ExtractionCache::new(backend.clone(), &config);
        (backend, cache)
    }

    #[tokio::test]
    async fn test_save_then_exact_get() {
        let (_, cache) = cache();
        let s = schema(&[("nome", "Nome"), ("cpf", "CPF")]);
        let result = response(&[("nome", Some("Maria")), ("cpf", None)]);
        let meta = SaveMeta {
            strategies: Some(StrategiesUsed {
                cache: 0,
                extracted: 1,
                cache_type: CacheType::None,
            }),
            ..SaveMeta::default()
        };
        assert!(cache.save("cnh", "p1", &s, &result, meta).await);

        let hit = cache.get("cnh", "p1", &s).await.unwrap();
        assert_eq!(hit.result, result);
        assert_eq!(hit.fields_total, 2);
        assert_eq!(hit.fields_extracted, 1);
        assert!((hit.success_rate - 0.5).abs() < 1e-9);
        assert!(cache.get("other", "p1", &s).await.is_none());

        let stats = cache.daily_stats(Utc::now().date_naive()).await;
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_miss_and_deleted() {
        let (backend, cache) = cache();
        let s = schema(&[("nome", "Nome")]);
        let key = cache.cache_key("cnh", "p1", &s);
        backend
            .hash_set_all(&key, &[("result_json".to_string(), "{not json".to_string())], None)
            .await
            .unwrap();

        assert!(cache.get("cnh", "p1", &s).await.is_none());
        assert!(!backend.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_prior_values_across_schemas() {
        let (_, cache) = cache();
        let first = schema(&[("nome", "Nome"), ("cpf", "CPF")]);
        let meta = SaveMeta {
            extracted_text: Some("Nome: Maria\nCPF: 123".to_string()),
            ..SaveMeta::default()
        };
        cache
            .save("cnh", "p1", &first, &response(&[("nome", Some("Maria")), ("cpf", None)]), meta)
            .await;
        let second = schema(&[("cpf", "Número do CPF")]);
        cache
            .save("rg", "p1", &second, &response(&[("cpf", Some("123"))]), SaveMeta::default())
            .await;
        cache
            .save("cnh", "p2", &first, &response(&[("nome", Some("Outro"))]), SaveMeta::default())
            .await;

        let prior = cache.prior("p1").await;
        assert_eq!(prior.records, 2);
        assert_eq!(prior.known.get("nome"), Some("Maria"));
        assert_eq!(prior.known.get("cpf"), Some("123"));
        assert_eq!(prior.text.as_deref(), Some("Nome: Maria\nCPF: 123"));
        assert!(cache.previously_extracted("p3").await.is_empty());
        assert!(cache.cached_text("p3").await.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_miss() {
        let (backend, cache) = cache();
        backend.set_available(false);
        let s = schema(&[("nome", "Nome")]);
        assert!(!cache.save("cnh", "p1", &s, &response(&[]), SaveMeta::default()).await);
        assert!(cache.get("cnh", "p1", &s).await.is_none());
        assert!(cache.all_for_pdf("p1").await.is_empty());
    }
}
