//! Configuration sections.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache behaviour, retry policy and circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOptions {
    /// TTL applied to cached extraction records.
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,
    /// TTL applied to daily metric counters.
    #[serde(default = "default_metrics_ttl_seconds")]
    pub metrics_ttl_seconds: u64,
    /// Retries after the first attempt of a store operation.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base retry delay; attempt `n` waits `n * retry_delay_ms`.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Consecutive failures that open the circuit breaker.
    #[serde(default = "default_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    /// How long the breaker stays open.
    #[serde(default = "default_breaker_duration")]
    pub circuit_breaker_duration_seconds: u64,
    /// COUNT hint used when scanning keys.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

fn default_ttl_seconds() -> u64 {
    604_800
}

fn default_metrics_ttl_seconds() -> u64 {
    7_776_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_breaker_threshold() -> u32 {
    5
}

fn default_breaker_duration() -> u64 {
    30
}

fn default_scan_page_size() -> usize {
    1000
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            default_ttl_seconds: default_ttl_seconds(),
            metrics_ttl_seconds: default_metrics_ttl_seconds(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            circuit_breaker_threshold: default_breaker_threshold(),
            circuit_breaker_duration_seconds: default_breaker_duration(),
            scan_page_size: default_scan_page_size(),
        }
    }
}

impl CacheOptions {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn metrics_ttl(&self) -> Duration {
        Duration::from_secs(self.metrics_ttl_seconds)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_duration_seconds)
    }
}

/// Content hashing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingOptions {
    /// Hex characters of the SHA-256 digest kept in cache keys.
    #[serde(default = "default_truncate_length")]
    pub truncate_length: usize,
}

fn default_truncate_length() -> usize {
    40
}

impl Default for HashingOptions {
    fn default() -> Self {
        Self {
            truncate_length: default_truncate_length(),
        }
    }
}

/// Parameters passed to the residual semantic pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOptions {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_true")]
    pub enable_gpt_fallback: bool,
    /// Minimum length of description words used as stage C keywords.
    #[serde(default = "default_min_keyword_length")]
    pub min_keyword_length: usize,
}

fn default_confidence_threshold() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_min_keyword_length() -> usize {
    3
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            enable_gpt_fallback: true,
            min_keyword_length: default_min_keyword_length(),
        }
    }
}

/// Endpoints of the external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_url")]
    pub text_extraction_url: String,
    #[serde(default = "default_service_url")]
    pub semantic_url: String,
    #[serde(default = "default_service_url")]
    pub label_detection_url: String,
    /// Request timeout. Unset means the HTTP client never times out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_service_url() -> String {
    "http://pdf-extractor:5000".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            text_extraction_url: default_service_url(),
            semantic_url: default_service_url(),
            label_detection_url: default_service_url(),
            timeout_secs: None,
        }
    }
}

/// Supported cache store backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    #[default]
    Memory,
    Redis,
}

/// Cache store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub provider: StoreProvider,
    #[serde(default = "default_store_url")]
    pub url: String,
}

fn default_store_url() -> String {
    "redis://localhost:6379".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::default(),
            url: default_store_url(),
        }
    }
}

/// Extraction history persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
}

fn default_user_id() -> String {
    "default-user".to_string()
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_metrics_ttl_seconds(),
            default_user_id: default_user_id(),
        }
    }
}

impl HistoryOptions {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Background label detection run per batch item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDetectionOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_label_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Matches kept per candidate.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_min_keyword_length")]
    pub min_token_length: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

fn default_label_ttl_seconds() -> u64 {
    2_592_000
}

fn default_top_k() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.5
}

impl Default for LabelDetectionOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_label_ttl_seconds(),
            top_k: default_top_k(),
            min_token_length: default_min_keyword_length(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

impl LabelDetectionOptions {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// How long finished batch jobs stay queryable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Completed jobs older than this are forgotten.
    #[serde(default = "default_job_retention_seconds")]
    pub job_retention_seconds: u64,
    /// Completed jobs kept at most; the oldest go first.
    #[serde(default = "default_max_retained_jobs")]
    pub max_retained_jobs: usize,
}

fn default_job_retention_seconds() -> u64 {
    3_600
}

fn default_max_retained_jobs() -> usize {
    1_000
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            job_retention_seconds: default_job_retention_seconds(),
            max_retained_jobs: default_max_retained_jobs(),
        }
    }
}

impl BatchOptions {
    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_seconds)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOptions {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
