//! Persisted extraction record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display, EnumString, IntoStaticStr};

use super::schema::ExtractorResponse;
use crate::error::{DocexError, DocexResult};

/// Format tag written into every cached record.
pub const CACHE_VERSION: &str = "1.0";

/// How a result was produced relative to the extraction cache.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Full hit on (label, pdf, schema).
    Exact,
    /// Every field was known from earlier extractions of the same document.
    PartialComplete,
    /// Some fields came from earlier extractions, the rest were extracted now.
    PartialHybrid,
    /// Fully fresh extraction.
    None,
}

impl CacheType {
    pub fn used_cache(self) -> bool {
        !matches!(self, CacheType::None)
    }
}

/// Where the fields of a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategiesUsed {
    pub cache: usize,
    pub extracted: usize,
    pub cache_type: CacheType,
}

/// Cached result of one (label, pdf, schema) extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedExtraction {
    pub result: ExtractorResponse,
    pub label: String,
    pub pdf_hash: String,
    pub extracted_text: Option<String>,
    pub pdf_size_bytes: u64,
    pub extracted_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub fields_total: usize,
    pub fields_extracted: usize,
    pub success_rate: f64,
    pub strategies_used: Option<StrategiesUsed>,
    pub cache_version: String,
}

impl CachedExtraction {
    /// Encode as flat hash fields.
    pub fn to_hash_fields(&self) -> DocexResult<Vec<(String, String)>> {
        let mut fields = vec![
            ("result_json".to_string(), serde_json::to_string(&self.result)?),
            ("label".to_string(), self.label.clone()),
            ("pdf_hash".to_string(), self.pdf_hash.clone()),
            ("pdf_size_bytes".to_string(), self.pdf_size_bytes.to_string()),
            ("extracted_at".to_string(), self.extracted_at.to_rfc3339()),
            (
                "processing_time_ms".to_string(),
                self.processing_time_ms.to_string(),
            ),
            ("tokens_used".to_string(), self.tokens_used.to_string()),
            ("cost_usd".to_string(), self.cost_usd.to_string()),
            ("fields_total".to_string(), self.fields_total.to_string()),
            (
                "fields_extracted".to_string(),
                self.fields_extracted.to_string(),
            ),
            ("success_rate".to_string(), self.success_rate.to_string()),
            ("cache_version".to_string(), self.cache_version.clone()),
        ];
        if let Some(text) = &self.extracted_text {
            fields.push(("extracted_text".to_string(), text.clone()));
        }
        if let Some(strategies) = &self.strategies_used {
            fields.push((
                "strategies_used".to_string(),
                serde_json::to_string(strategies)?,
            ));
        }
        Ok(fields)
    }

    /// Decode from hash fields. Any missing or malformed field is corruption.
    pub fn from_hash_fields(fields: &HashMap<String, String>) -> DocexResult<Self> {
        let result_json = required(fields, "result_json")?;
        let result: ExtractorResponse = serde_json::from_str(result_json)
            .map_err(|e| DocexError::cache_corrupted(format!("result_json: {}", e)))?;

        let extracted_at = DateTime::parse_from_rfc3339(required(fields, "extracted_at")?)
            .map_err(|e| DocexError::cache_corrupted(format!("extracted_at: {}", e)))?
            .with_timezone(&Utc);

        let strategies_used = match fields.get("strategies_used") {
            Some(raw) => Some(
                serde_json::from_str(raw)
                    .map_err(|e| DocexError::cache_corrupted(format!("strategies_used: {}", e)))?,
            ),
            None => None,
        };

        Ok(Self {
            result,
            label: required(fields, "label")?.to_string(),
            pdf_hash: required(fields, "pdf_hash")?.to_string(),
            extracted_text: fields.get("extracted_text").cloned(),
            pdf_size_bytes: parsed(fields, "pdf_size_bytes")?,
            extracted_at,
            processing_time_ms: parsed(fields, "processing_time_ms")?,
            tokens_used: parsed(fields, "tokens_used")?,
            cost_usd: parsed(fields, "cost_usd")?,
            fields_total: parsed(fields, "fields_total")?,
            fields_extracted: parsed(fields, "fields_extracted")?,
            success_rate: parsed(fields, "success_rate")?,
            strategies_used,
            cache_version: fields
                .get("cache_version")
                .cloned()
                .unwrap_or_else(|| CACHE_VERSION.to_string()),
        })
    }
}

fn required<'a>(fields: &'a HashMap<String, String>, name: &str) -> DocexResult<&'a str> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| DocexError::cache_corrupted(format!("missing field '{}'", name)))
}

fn parsed<T: FromStr>(fields: &HashMap<String, String>, name: &str) -> DocexResult<T> {
    required(fields, name)?
        .parse()
        .map_err(|_| DocexError::cache_corrupted(format!("malformed field '{}'", name)))
}
