//! Client for the semantic label detection endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use docex_core::error::{DocexError, DocexResult, ErrorCode};
use docex_core::traits::{LabelDetectRequest, LabelDetectResponse, LabelDetector};

use crate::http;

const SERVICE: &str = "Label detection service";

/// HTTP client for `POST /semantic-label-detect`.
pub struct LabelDetectClient {
    client: Client,
    base_url: String,
}

impl LabelDetectClient {
    pub fn new(base_url: &str) -> DocexResult<Self> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> DocexResult<Self> {
        Ok(Self {
            client: http::client(timeout)?,
            base_url: http::base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LabelDetector for LabelDetectClient {
    async fn detect_labels(&self, request: &LabelDetectRequest) -> DocexResult<LabelDetectResponse> {
        let response = self
            .client
            .post(format!("{}/semantic-label-detect", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| http::transport_error(SERVICE, e))?;

        let response = http::check_status(response, SERVICE, DocexError::semantic).await?;

        let body: LabelDetectResponse = response.json().await.map_err(|e| DocexError::Semantic {
            message: format!("Failed to parse {} response: {}", SERVICE, e),
            code: ErrorCode::SemInvalidResponse,
            source: Some(Box::new(e)),
        })?;

        debug!(
            detected = body.detected_labels.len(),
            candidates = body.total_candidates,
            model = %body.model_used,
            "Labels detected by service"
        );
        Ok(body)
    }
}
