//! Sequential field extraction over one document's text.
//!
//! Stages run strictly in order, each over what the previous one left:
//!
//! 1. classify every field and split it into structured (enum/regex) and
//!    free-text fields, ordered by (priority, schema position);
//! 2. resolve structured fields locally, removing each matched value from
//!    the working lines;
//! 3. strip the free-text fields' labels from the remaining lines;
//! 4. send the residual text and the still-pending fields to the semantic
//!    service in a single call.
//!
//! The response always has exactly the schema's keys.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classify::classify_schema;
use crate::config::ExtractionOptions;
use crate::error::DocexResult;
use crate::traits::{SemanticExtractor, SemanticRequest};
use crate::types::{ExtractorResponse, FieldSpec, Schema};

use super::lines::LineStore;
use super::strategy::{resolves_locally, strategy_for};

/// Separators used to split descriptions into label keywords.
const KEYWORD_SEPARATORS: &[char] = &[' ', ',', ';', ':', '-', '/'];

pub struct SequentialExtractor {
    semantic: Arc<dyn SemanticExtractor>,
    options: ExtractionOptions,
}

impl SequentialExtractor {
    pub fn new(semantic: Arc<dyn SemanticExtractor>, options: ExtractionOptions) -> Self {
        Self { semantic, options }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Extract every schema field from `text`.
    ///
    /// Field-level failures become `null`. A failed semantic call fails the
    /// whole extraction.
    pub async fn extract(
        &self,
        label: &str,
        schema: &Schema,
        text: &str,
    ) -> DocexResult<ExtractorResponse> {
        let trace_id: String = Uuid::new_v4().simple().to_string().chars().take(12).collect();
        let span = info_span!("extract", trace_id = %trace_id, label);
        self.run(schema, text).instrument(span).await
    }

    async fn run(&self, schema: &Schema, text: &str) -> DocexResult<ExtractorResponse> {
        if schema.is_empty() {
            return Ok(ExtractorResponse::new());
        }

        // Stage A
        let (structured, free_text) = partition(classify_schema(schema));
        info!(
            fields = schema.len(),
            structured = structured.len(),
            free_text = free_text.len(),
            "Classified fields"
        );

        // Stage B
        let mut lines = LineStore::from_text(text);
        let mut resolved: HashMap<String, String> = HashMap::new();
        for field in &structured {
            if let Some(value) = claim_structured(field, &mut lines) {
                resolved.insert(field.name.clone(), value);
            }
        }
        let flushed = lines.flush_removals();
        info!(
            resolved = resolved.len(),
            lines_removed = flushed,
            lines_left = lines.len(),
            "Structured pass done"
        );

        // Stage C
        if !free_text.is_empty() {
            let keywords = label_keywords(&free_text, self.options.min_keyword_length);
            debug!(keywords = keywords.len(), "Stripping field labels");
            lines.strip_keywords(&keywords);
        }

        // Stage D
        let semantic = self.semantic_pass(schema, &free_text, &lines).await?;

        Ok(schema.project(|name| {
            resolved
                .get(name)
                .cloned()
                .or_else(|| semantic.get(name).cloned())
        }))
    }

    async fn semantic_pass(
        &self,
        schema: &Schema,
        pending: &[FieldSpec],
        lines: &LineStore,
    ) -> DocexResult<HashMap<String, String>> {
        if pending.is_empty() {
            debug!("No pending fields, skipping semantic pass");
            return Ok(HashMap::new());
        }

        let names: Vec<&str> = pending.iter().map(|f| f.name.as_str()).collect();
        let request = SemanticRequest {
            label: None,
            text: lines.joined(),
            schema: schema.subset(&names),
            confidence_threshold: self.options.confidence_threshold,
            enable_gpt_fallback: self.options.enable_gpt_fallback,
        };
        let response = self.semantic.smart_extract(&request).await?;

        let found: HashMap<String, String> = names
            .iter()
            .filter_map(|name| response.value_of(name).map(|v| (name.to_string(), v)))
            .collect();
        info!(
            pending = names.len(),
            found = found.len(),
            gpt_fallback = response.gpt_fallback_used,
            cache_hit = response.cache_hit,
            "Semantic pass done"
        );
        Ok(found)
    }
}

/// Split into (structured, free text), each ordered by (priority, position).
///
/// Structured fields the local pass cannot resolve join the free-text side
/// so the semantic pass still sees them.
fn partition(mut fields: Vec<FieldSpec>) -> (Vec<FieldSpec>, Vec<FieldSpec>) {
    fields.sort_by_key(|f| (f.priority(), f.order));
    fields.into_iter().partition(|f| {
        let local = f.field_type.is_structured() && resolves_locally(f);
        if f.field_type.is_structured() && !local {
            debug!(field = %f.name, field_type = %f.field_type, "No local candidates, deferring to semantic pass");
        }
        local
    })
}

fn claim_structured(field: &FieldSpec, lines: &mut LineStore) -> Option<String> {
    let Some(strategy) = strategy_for(field.field_type) else {
        debug!(field = %field.name, field_type = %field.field_type, "No strategy for field type");
        return None;
    };
    match strategy(field, lines) {
        Ok(Some(value)) => {
            if !lines.claim(&value) {
                debug!(field = %field.name, "Matched value not found for removal");
            }
            debug!(field = %field.name, field_type = %field.field_type, "Field resolved");
            Some(value)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(field = %field.name, error = %e, "Field extraction failed");
            None
        }
    }
}

/// Field names plus every description word of at least `min_len` chars.
fn label_keywords(fields: &[FieldSpec], min_len: usize) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let mut push = |word: &str| {
        let word = word.trim();
        if !word.is_empty() && !keywords.iter().any(|k| k.eq_ignore_ascii_case(word)) {
            keywords.push(word.to_string());
        }
    };
    for field in fields {
        push(field.name.as_str());
        field
            .description
            .split(KEYWORD_SEPARATORS)
            .filter(|w| w.chars().count() >= min_len)
            .for_each(&mut push);
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockSemanticExtractor, SemanticResponse};
    use crate::types::FieldType;

    fn schema(pairs: &[(&str, &str)]) -> Schema {
        pairs.iter().copied().collect()
    }

    fn extractor(mock: MockSemanticExtractor) -> SequentialExtractor {
        SequentialExtractor::new(Arc::new(mock), ExtractionOptions::default())
    }

    #[test]
    fn test_partition_is_stable_by_priority() {
        let s = schema(&[
            ("endereco", "Endereço completo"),
            ("nome", "Nome"),
            ("cpf", "CPF"),
            ("situacao", "pode ser ATIVO, INATIVO"),
            ("nascimento", "Data de nascimento"),
        ]);
        let (structured, free_text) = partition(classify_schema(&s));
        let names = |v: &[FieldSpec]| v.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&structured), vec!["situacao", "cpf", "nascimento"]);
        assert_eq!(names(&free_text), vec!["nome", "endereco"]);
        assert_eq!(free_text[1].field_type, FieldType::MultiLine);
    }

    #[test]
    fn test_label_keywords() {
        let fields = classify_schema(&schema(&[("nome", "Nome do titular; ou - a/b")]));
        assert_eq!(label_keywords(&fields, 3), vec!["nome", "titular"]);
    }

    #[tokio::test]
    async fn test_structured_only_schema_never_calls_semantic() {
        let mut mock = MockSemanticExtractor::new();
        mock.expect_smart_extract().times(0);
        let result = extractor(mock)
            .extract(
                "cnh",
                &schema(&[("cpf", "CPF do titular")]),
                "CPF: 123.456.789-00",
            )
            .await
            .unwrap();
        assert_eq!(result["cpf"].as_deref(), Some("123.456.789-00"));
    }

    #[tokio::test]
    async fn test_semantic_gets_residual_text_and_pending_schema() {
        let mut mock = MockSemanticExtractor::new();
        mock.expect_smart_extract()
            .withf(|req| {
                req.label.is_none()
                    && req.schema.names().collect::<Vec<_>>() == vec!["nome"]
                    && !req.text.contains("123.456.789-00")
                    && req.text.contains("maria silva")
                    && req.enable_gpt_fallback
            })
            .times(1)
            .returning(|_| {
                let mut response = SemanticResponse::default();
                response
                    .fields
                    .insert("nome".to_string(), Some("Maria Silva".to_string()).into());
                response
                    .fields
                    .insert("extra".to_string(), Some("ignored".to_string()).into());
                Ok(response)
            });

        let result = extractor(mock)
            .extract(
                "cnh",
                &schema(&[("nome", "Nome do titular"), ("cpf", "CPF")]),
                "Nome: Maria Silva\nCPF: 123.456.789-00",
            )
            .await
            .unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["nome", "cpf"]);
        assert_eq!(result["nome"].as_deref(), Some("Maria Silva"));
        assert_eq!(result["cpf"].as_deref(), Some("123.456.789-00"));
    }

    #[tokio::test]
    async fn test_enum_without_candidates_goes_to_semantic() {
        let mut mock = MockSemanticExtractor::new();
        mock.expect_smart_extract()
            .withf(|req| req.schema.names().collect::<Vec<_>>() == vec!["documento"])
            .times(1)
            .returning(|_| {
                let mut response = SemanticResponse::default();
                response
                    .fields
                    .insert("documento".to_string(), Some("CNPJ".to_string()).into());
                Ok(response)
            });

        let s = schema(&[("documento", "Documento apresentado, pode ser CPF ou CNPJ")]);
        assert_eq!(classify_schema(&s)[0].field_type, FieldType::Enum);
        let result = extractor(mock)
            .extract("cnh", &s, "Documento: CNPJ")
            .await
            .unwrap();
        assert_eq!(result["documento"].as_deref(), Some("CNPJ"));
    }

    #[tokio::test]
    async fn test_unrecognised_choice_phrase_goes_to_semantic() {
        let mut mock = MockSemanticExtractor::new();
        mock.expect_smart_extract().times(1).returning(|_| {
            let mut response = SemanticResponse::default();
            response
                .fields
                .insert("status".to_string(), Some("ACTIVE".to_string()).into());
            Ok(response)
        });

        let result = extractor(mock)
            .extract(
                "cnh",
                &schema(&[("status", "Status, one of ACTIVE or INACTIVE")]),
                "Status: ACTIVE",
            )
            .await
            .unwrap();
        assert_eq!(result["status"].as_deref(), Some("ACTIVE"));
    }

    #[tokio::test]
    async fn test_semantic_failure_fails_extraction() {
        let mut mock = MockSemanticExtractor::new();
        mock.expect_smart_extract()
            .returning(|_| Err(crate::error::DocexError::semantic("service down")));
        let result = extractor(mock)
            .extract("cnh", &schema(&[("nome", "Nome")]), "Maria")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_schema_yields_empty_response() {
        let mut mock = MockSemanticExtractor::new();
        mock.expect_smart_extract().times(0);
        let result = extractor(mock)
            .extract("cnh", &Schema::new(), "anything")
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}
