//! Per-type claim strategies for the structured pass.

use crate::classify::{extract_enum_values, find_best_match};
use crate::error::{DocexError, DocexResult};
use crate::patterns::apply_type_patterns;
use crate::types::{FieldSpec, FieldType};

use super::lines::LineStore;

/// Finds a field's value among the live lines without consuming it.
pub type Strategy = fn(&FieldSpec, &LineStore) -> DocexResult<Option<String>>;

const STRATEGIES: &[(FieldType, Strategy)] = &[
    (FieldType::Enum, match_enum),
    (FieldType::Date, match_patterns),
    (FieldType::Currency, match_patterns),
    (FieldType::Percentage, match_patterns),
    (FieldType::Phone, match_patterns),
    (FieldType::Cpf, match_patterns),
    (FieldType::Cnpj, match_patterns),
    (FieldType::Email, match_patterns),
    (FieldType::Cep, match_patterns),
    (FieldType::Number, match_patterns),
];

/// Strategy for a field type; `None` for types left to the semantic pass.
pub fn strategy_for(field_type: FieldType) -> Option<Strategy> {
    STRATEGIES
        .iter()
        .find(|(t, _)| *t == field_type)
        .map(|(_, strategy)| *strategy)
}

/// Whether the structured pass can resolve `field` at all.
///
/// An enum whose description yields no candidate values (every caps token
/// on the stoplist, say) has nothing to match and belongs to the semantic
/// pass instead.
pub fn resolves_locally(field: &FieldSpec) -> bool {
    match field.field_type {
        FieldType::Enum => !extract_enum_values(&field.description).is_empty(),
        other => strategy_for(other).is_some(),
    }
}

fn match_enum(field: &FieldSpec, lines: &LineStore) -> DocexResult<Option<String>> {
    let values = extract_enum_values(&field.description);
    Ok(find_best_match(&lines.texts(), 0, &values).map(|m| m.value))
}

fn match_patterns(field: &FieldSpec, lines: &LineStore) -> DocexResult<Option<String>> {
    for line in lines.texts() {
        let hit = apply_type_patterns(line, field.field_type)
            .map_err(|e| DocexError::extraction(&field.name, e.to_string()))?;
        if let Some(hit) = hit {
            tracing::debug!(field = %field.name, pattern = hit.pattern, "Pattern matched");
            return Ok(Some(hit.value));
        }
    }
    Ok(None)
}
