//! Client for the smart-extract (embeddings, NLI, GPT) service.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use docex_core::error::{DocexError, DocexResult, ErrorCode};
use docex_core::traits::{SemanticExtractor, SemanticRequest, SemanticResponse};

use crate::http;

const SERVICE: &str = "Smart-extract service";

/// HTTP client for the semantic fallback collaborator.
pub struct SmartExtractClient {
    client: Client,
    base_url: String,
}

impl SmartExtractClient {
    /// Create a client for the service at `base_url`, without a timeout.
    pub fn new(base_url: &str) -> DocexResult<Self> {
        Self::with_timeout(base_url, None)
    }

    /// Create a client with an optional request timeout.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> DocexResult<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: http::base_url(base_url)?,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> DocexResult<Self> {
        let base_url = std::env::var("DOCEX_SEMANTIC_URL")
            .map_err(|_| DocexError::Configuration("DOCEX_SEMANTIC_URL not set".to_string()))?;
        Self::with_timeout(&base_url, http::env_timeout("DOCEX_SERVICE_TIMEOUT_SECS"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SemanticExtractor for SmartExtractClient {
    async fn smart_extract(&self, request: &SemanticRequest) -> DocexResult<SemanticResponse> {
        debug!(
            fields = request.schema.len(),
            chars = request.text.len(),
            "Calling smart-extract"
        );

        let response = self
            .client
            .post(format!("{}/smart-extract", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| http::transport_error(SERVICE, e))?;

        let response = http::check_status(response, SERVICE, DocexError::semantic).await?;

        let body: SemanticResponse = response.json().await.map_err(|e| DocexError::Semantic {
            message: format!("Failed to parse {} response: {}", SERVICE, e),
            code: ErrorCode::SemInvalidResponse,
            source: Some(Box::new(e)),
        })?;

        info!(
            cache_hit = body.cache_hit,
            gpt_fallback = body.gpt_fallback_used,
            avg_confidence = body.avg_confidence,
            "Smart-extract answered"
        );
        Ok(body)
    }
}
