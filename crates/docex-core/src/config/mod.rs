//! Configuration types for docex.

mod options;

pub use options::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DocexError, DocexResult};

/// Top-level configuration shared by the extractor, cache and server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub cache: CacheOptions,
    pub hashing: HashingOptions,
    pub extraction: ExtractionOptions,
    pub services: ServiceConfig,
    pub store: StoreConfig,
    pub history: HistoryOptions,
    pub labels: LabelDetectionOptions,
    pub batch: BatchOptions,
    pub server: ServerOptions,
}

impl ExtractorConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> DocexResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| DocexError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| DocexError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| DocexError::Configuration(e.to_string())),
            _ => Err(DocexError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Default location of the user config file (`~/.config/docex/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docex").join("config.toml"))
    }

    /// Load the default config file if present, then apply environment overrides.
    pub fn load() -> DocexResult<Self> {
        let base = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// Load configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `DOCEX_TEXT_EXTRACTION_URL`, `DOCEX_SEMANTIC_URL`, `DOCEX_LABEL_DETECTION_URL`
    /// - `DOCEX_SERVICE_TIMEOUT_SECS`
    /// - `DOCEX_STORE_PROVIDER` (`memory` | `redis`), `DOCEX_REDIS_URL`
    /// - `DOCEX_CACHE_TTL_SECONDS`, `DOCEX_CACHE_MAX_RETRIES`, `DOCEX_CACHE_RETRY_DELAY_MS`
    /// - `DOCEX_BREAKER_THRESHOLD`, `DOCEX_BREAKER_DURATION_SECONDS`
    /// - `DOCEX_HASH_TRUNCATE_LENGTH`, `DOCEX_CONFIDENCE_THRESHOLD`
    /// - `DOCEX_HISTORY_ENABLED`, `DOCEX_DEFAULT_USER_ID`
    /// - `DOCEX_LABEL_DETECTION_ENABLED`
    /// - `DOCEX_JOB_RETENTION_SECONDS`, `DOCEX_MAX_RETAINED_JOBS`
    /// - `DOCEX_HOST`, `DOCEX_PORT`
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DOCEX_TEXT_EXTRACTION_URL") {
            self.services.text_extraction_url = url;
        }
        if let Ok(url) = std::env::var("DOCEX_SEMANTIC_URL") {
            self.services.semantic_url = url;
        }
        if let Ok(url) = std::env::var("DOCEX_LABEL_DETECTION_URL") {
            self.services.label_detection_url = url;
        }
        if let Some(secs) = env_parse("DOCEX_SERVICE_TIMEOUT_SECS") {
            self.services.timeout_secs = Some(secs);
        }

        if let Ok(provider) = std::env::var("DOCEX_STORE_PROVIDER") {
            self.store.provider = match provider.to_lowercase().as_str() {
                "redis" => StoreProvider::Redis,
                _ => StoreProvider::Memory,
            };
        }
        if let Ok(url) = std::env::var("DOCEX_REDIS_URL") {
            self.store.url = url;
        }

        if let Some(ttl) = env_parse("DOCEX_CACHE_TTL_SECONDS") {
            self.cache.default_ttl_seconds = ttl;
        }
        if let Some(retries) = env_parse("DOCEX_CACHE_MAX_RETRIES") {
            self.cache.max_retries = retries;
        }
        if let Some(delay) = env_parse("DOCEX_CACHE_RETRY_DELAY_MS") {
            self.cache.retry_delay_ms = delay;
        }
        if let Some(threshold) = env_parse("DOCEX_BREAKER_THRESHOLD") {
            self.cache.circuit_breaker_threshold = threshold;
        }
        if let Some(secs) = env_parse("DOCEX_BREAKER_DURATION_SECONDS") {
            self.cache.circuit_breaker_duration_seconds = secs;
        }

        if let Some(len) = env_parse("DOCEX_HASH_TRUNCATE_LENGTH") {
            self.hashing.truncate_length = len;
        }
        if let Some(threshold) = env_parse("DOCEX_CONFIDENCE_THRESHOLD") {
            self.extraction.confidence_threshold = threshold;
        }

        if let Some(enabled) = env_parse("DOCEX_HISTORY_ENABLED") {
            self.history.enabled = enabled;
        }
        if let Ok(user) = std::env::var("DOCEX_DEFAULT_USER_ID") {
            self.history.default_user_id = user;
        }

        if let Some(enabled) = env_parse("DOCEX_LABEL_DETECTION_ENABLED") {
            self.labels.enabled = enabled;
        }
        if let Some(secs) = env_parse("DOCEX_JOB_RETENTION_SECONDS") {
            self.batch.job_retention_seconds = secs;
        }
        if let Some(max) = env_parse("DOCEX_MAX_RETAINED_JOBS") {
            self.batch.max_retained_jobs = max;
        }

        if let Ok(host) = std::env::var("DOCEX_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("DOCEX_PORT") {
            self.server.port = port;
        }

        self
    }

    /// Create a builder for configuration.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for ExtractorConfig.
#[derive(Default)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    /// Set the cache options.
    pub fn cache(mut self, cache: CacheOptions) -> Self {
        self.config.cache = cache;
        self
    }

    /// Set the hash truncation length.
    pub fn hash_truncate_length(mut self, len: usize) -> Self {
        self.config.hashing.truncate_length = len;
        self
    }

    /// Set the extraction options.
    pub fn extraction(mut self, extraction: ExtractionOptions) -> Self {
        self.config.extraction = extraction;
        self
    }

    /// Set the collaborator endpoints.
    pub fn services(mut self, services: ServiceConfig) -> Self {
        self.config.services = services;
        self
    }

    /// Set the cache store.
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.config.store = store;
        self
    }

    /// Set the history options.
    pub fn history(mut self, history: HistoryOptions) -> Self {
        self.config.history = history;
        self
    }

    /// Set the label detection options.
    pub fn labels(mut self, labels: LabelDetectionOptions) -> Self {
        self.config.labels = labels;
        self
    }

    /// Set the batch job retention.
    pub fn batch(mut self, batch: BatchOptions) -> Self {
        self.config.batch = batch;
        self
    }

    /// Set the server listener.
    pub fn server(mut self, server: ServerOptions) -> Self {
        self.config.server = server;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ExtractorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.cache.default_ttl_seconds, 604_800);
        assert_eq!(config.cache.max_retries, 3);
        assert_eq!(config.cache.circuit_breaker_threshold, 5);
        assert_eq!(config.hashing.truncate_length, 40);
        assert!((config.extraction.confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert!(config.extraction.enable_gpt_fallback);
        assert_eq!(config.services.semantic_url, "http://pdf-extractor:5000");
        assert_eq!(config.store.provider, StoreProvider::Memory);
        assert_eq!(config.history.default_user_id, "default-user");
        assert!(config.labels.enabled);
        assert_eq!(config.labels.ttl_seconds, 2_592_000);
        assert_eq!(config.labels.top_k, 3);
        assert_eq!(config.batch.job_retention_seconds, 3_600);
    }

    #[test]
    fn test_labels_and_batch_sections_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[labels]\nenabled = false\ntop_k = 5\n\n[batch]\nmax_retained_jobs = 10"
        )
        .unwrap();

        let config = ExtractorConfig::from_file(file.path()).unwrap();
        assert!(!config.labels.enabled);
        assert_eq!(config.labels.top_k, 5);
        assert_eq!(config.labels.min_token_length, 3);
        assert_eq!(config.batch.max_retained_jobs, 10);
        assert_eq!(config.batch.job_retention_seconds, 3_600);
    }

    #[test]
    fn test_from_toml_file_partial() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[cache]\nmax_retries = 1\n\n[store]\nprovider = \"redis\"\nurl = \"redis://cache:6379\""
        )
        .unwrap();

        let config = ExtractorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cache.max_retries, 1);
        assert_eq!(config.cache.retry_delay_ms, 100);
        assert_eq!(config.store.provider, StoreProvider::Redis);
        assert_eq!(config.store.url, "redis://cache:6379");
        assert_eq!(config.hashing.truncate_length, 40);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "hashing:\n  truncate_length: 16").unwrap();

        let config = ExtractorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.hashing.truncate_length, 16);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = ExtractorConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, DocexError::Configuration(_)));
    }

    #[test]
    fn test_builder() {
        let config = ExtractorConfig::builder()
            .hash_truncate_length(64)
            .server(ServerOptions {
                host: "127.0.0.1".to_string(),
                port: 9000,
            })
            .build();
        assert_eq!(config.hashing.truncate_length, 64);
        assert_eq!(config.server.port, 9000);
    }
}
