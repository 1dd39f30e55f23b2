//! PDF-to-text collaborator.

use async_trait::async_trait;

use crate::error::DocexResult;

/// Converts a base64-encoded PDF into plain text.
///
/// Transport failures and non-success responses are errors; there is no
/// local fallback.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, pdf_base64: &str) -> DocexResult<String>;
}
