//! docex-client - HTTP clients for the docex collaborator services.
//!
//! This crate implements the collaborator traits from `docex-core` over
//! HTTP: [`TextExtractionClient`] converts PDFs to text,
//! [`SmartExtractClient`] resolves residual fields semantically and
//! [`LabelDetectClient`] finds the snippets labelling each schema field.
//!
//! # Example
//!
//! ```ignore
//! use docex_client::{SmartExtractClient, TextExtractionClient};
//! use docex_core::TextExtractor;
//!
//! let text_client = TextExtractionClient::new("http://pdf-extractor:5000")?;
//! let text = text_client.extract_text(&pdf_base64).await?;
//!
//! let semantic = SmartExtractClient::from_env()?;
//! ```

mod http;
mod labels;
mod semantic;
mod text;

pub use labels::LabelDetectClient;
pub use semantic::SmartExtractClient;
pub use text::{TextExtractionClient, TextExtractionResponse};
pub use docex_core::traits::{
    LabelDetectRequest, LabelDetectResponse, LabelDetector, SemanticExtractor, SemanticRequest,
    SemanticResponse, TextExtractor,
};
