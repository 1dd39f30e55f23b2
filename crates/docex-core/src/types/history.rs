//! Extraction history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString, IntoStaticStr};

use super::cached::StrategiesUsed;
use super::schema::ExtractorResponse;
use crate::error::{DocexError, DocexResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Completed,
    Failed,
}

/// One processed document, as kept for auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub user_id: String,
    pub pdf_hash: String,
    pub pdf_filename: Option<String>,
    pub pdf_size_bytes: u64,
    pub label: String,
    pub template_id: Option<String>,
    pub schema_hash: String,
    pub extracted_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub fields_total: usize,
    pub fields_extracted: usize,
    pub success_rate: f64,
    pub strategies: Option<StrategiesUsed>,
    pub result: Option<ExtractorResponse>,
    pub error_message: Option<String>,
    pub status: HistoryStatus,
}

impl HistoryRecord {
    pub fn to_hash_fields(&self) -> DocexResult<Vec<(String, String)>> {
        let mut fields = vec![
            ("id".to_string(), self.id.clone()),
            ("user_id".to_string(), self.user_id.clone()),
            ("pdf_hash".to_string(), self.pdf_hash.clone()),
            ("pdf_size_bytes".to_string(), self.pdf_size_bytes.to_string()),
            ("label".to_string(), self.label.clone()),
            ("schema_hash".to_string(), self.schema_hash.clone()),
            ("extracted_at".to_string(), self.extracted_at.to_rfc3339()),
            (
                "processing_time_ms".to_string(),
                self.processing_time_ms.to_string(),
            ),
            ("fields_total".to_string(), self.fields_total.to_string()),
            (
                "fields_extracted".to_string(),
                self.fields_extracted.to_string(),
            ),
            ("success_rate".to_string(), self.success_rate.to_string()),
            ("status".to_string(), self.status.to_string()),
        ];
        let optional = [
            ("pdf_filename", self.pdf_filename.clone()),
            ("template_id", self.template_id.clone()),
            ("error_message", self.error_message.clone()),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                fields.push((name.to_string(), value));
            }
        }
        if let Some(strategies) = &self.strategies {
            fields.push(("strategies_json".to_string(), serde_json::to_string(strategies)?));
        }
        if let Some(result) = &self.result {
            fields.push(("result_json".to_string(), serde_json::to_string(result)?));
        }
        Ok(fields)
    }

    pub fn from_hash_fields(fields: &HashMap<String, String>) -> DocexResult<Self> {
        let get = |name: &str| {
            fields
                .get(name)
                .cloned()
                .ok_or_else(|| DocexError::cache_corrupted(format!("history missing '{}'", name)))
        };
        let num = |name: &str| -> DocexResult<f64> {
            get(name)?
                .parse()
                .map_err(|_| DocexError::cache_corrupted(format!("history malformed '{}'", name)))
        };

        let extracted_at = DateTime::parse_from_rfc3339(&get("extracted_at")?)
            .map_err(|e| DocexError::cache_corrupted(e.to_string()))?
            .with_timezone(&Utc);
        let status: HistoryStatus = get("status")?
            .parse()
            .map_err(|_| DocexError::cache_corrupted("history malformed 'status'"))?;
        let strategies = fields
            .get("strategies_json")
            .map(|raw| serde_json::from_str(raw))
            .transpose()?;
        let result = fields
            .get("result_json")
            .map(|raw| serde_json::from_str(raw))
            .transpose()?;

        Ok(Self {
            id: get("id")?,
            user_id: get("user_id")?,
            pdf_hash: get("pdf_hash")?,
            pdf_filename: fields.get("pdf_filename").cloned(),
            pdf_size_bytes: num("pdf_size_bytes")? as u64,
            label: get("label")?,
            template_id: fields.get("template_id").cloned(),
            schema_hash: get("schema_hash")?,
            extracted_at,
            processing_time_ms: num("processing_time_ms")? as u64,
            fields_total: num("fields_total")? as usize,
            fields_extracted: num("fields_extracted")? as usize,
            success_rate: num("success_rate")?,
            strategies,
            result,
            error_message: fields.get("error_message").cloned(),
            status,
        })
    }
}
