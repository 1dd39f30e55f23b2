//! Client for the PDF text-extraction service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use docex_core::error::{DocexError, DocexResult, ErrorCode};
use docex_core::traits::TextExtractor;

use crate::http;

const SERVICE: &str = "Text extraction service";

/// Response body of `POST /extract-text`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextExtractionResponse {
    pub success: bool,
    pub text: Option<String>,
    pub char_count: Option<usize>,
    pub error: Option<String>,
}

impl TextExtractionResponse {
    /// The text of a successful response.
    pub fn into_text(self) -> DocexResult<String> {
        if !self.success {
            let reason = self.error.unwrap_or_else(|| "no reason given".to_string());
            return Err(DocexError::text_extraction(format!(
                "{} reported failure: {}",
                SERVICE, reason
            )));
        }
        self.text.ok_or_else(|| DocexError::TextExtraction {
            message: format!("{} returned no text", SERVICE),
            code: ErrorCode::TxtEmptyResponse,
            source: None,
        })
    }
}

/// HTTP client for the text-extraction collaborator.
pub struct TextExtractionClient {
    client: Client,
    base_url: String,
}

impl TextExtractionClient {
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
        let base_url = std::env::var("DOCEX_TEXT_EXTRACTION_URL").map_err(|_| {
            DocexError::Configuration("DOCEX_TEXT_EXTRACTION_URL not set".to_string())
        })?;
        Self::with_timeout(&base_url, http::env_timeout("DOCEX_SERVICE_TIMEOUT_SECS"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TextExtractor for TextExtractionClient {
    async fn extract_text(&self, pdf_base64: &str) -> DocexResult<String> {
        let response = self
            .client
            .post(format!("{}/extract-text", self.base_url))
            .json(&json!({ "pdf_base64": pdf_base64 }))
            .send()
            .await
            .map_err(|e| http::transport_error(SERVICE, e))?;

        let response = http::check_status(response, SERVICE, DocexError::text_extraction).await?;

        let body: TextExtractionResponse = response.json().await.map_err(|e| {
            DocexError::text_extraction(format!("Failed to parse {} response: {}", SERVICE, e))
        })?;
        if let Some(count) = body.char_count {
            debug!(char_count = count, "Text extracted");
        }
        body.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_yields_text() {
        let body: TextExtractionResponse =
            serde_json::from_str(r#"{"success": true, "text": "Nome: Maria", "char_count": 11}"#)
                .unwrap();
        assert_eq!(body.into_text().unwrap(), "Nome: Maria");
    }

    #[test]
    fn test_failure_response_is_not_connectivity() {
        let body: TextExtractionResponse =
            serde_json::from_str(r#"{"success": false, "error": "encrypted PDF"}"#).unwrap();
        let err = body.into_text().unwrap_err();
        assert!(!err.is_connectivity());
        assert!(err.to_string().contains("encrypted PDF"));
    }

    #[test]
    fn test_missing_text_has_own_code() {
        let body: TextExtractionResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(body.into_text().unwrap_err().code().as_str(), "TXT_002");
    }

    #[test]
    fn test_new_validates_url() {
        assert!(TextExtractionClient::new("not a url").is_err());
        let client = TextExtractionClient::new("http://pdf-extractor:5000/").unwrap();
        assert_eq!(client.base_url(), "http://pdf-extractor:5000");
    }
}
