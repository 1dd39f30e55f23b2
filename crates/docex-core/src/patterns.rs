//! Pattern bank: named regex patterns grouped by field type.
//!
//! Patterns compile lazily on first use and stay cached for the life of the
//! process. Each regex-backed [`FieldType`] also gets one combined
//! alternation (`(?P<cpf>...)|(?P<cnpj>...)`) so a line is tested against all
//! of the type's patterns in a single pass.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{DocexError, DocexResult};
use crate::types::FieldType;

/// Named pattern sources. All compile case-insensitively.
const PATTERNS: &[(&str, &str)] = &[
    // Names and free text
    ("nome_proprio", r"^[A-ZÀÁÂÃÇÉÊÍÓÔÕÚ][A-ZÀ-Úa-zà-ú\s']+$"),
    ("texto_livre", r".+"),
    // Numbers
    ("numero_simples", r"\d+"),
    ("numero_com_letra", r"(\d+)\s*([A-Z]{2,})"),
    ("numero_decimal", r"\d+[.,]\d+"),
    // Brazilian documents
    ("cpf", r"\d{3}\.?\d{3}\.?\d{3}-?\d{2}"),
    ("cnpj", r"\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}"),
    ("rg", r"\d{1,2}\.?\d{3}\.?\d{3}-?[0-9X]"),
    // Addresses
    ("endereco", r"[A-ZÀÁÂÃÇÉÊÍÓÔÕÚ][A-ZÀ-Úa-zà-ú\s]+,\s*[NnºNo°]\s*\d+.*"),
    ("cep", r"\d{5}-?\d{3}"),
    ("sigla_estado", r"\b[A-Z]{2}\b"),
    ("cidade_estado", r"[A-ZÀÁÂÃÇÉÊÍÓÔÕÚ][A-ZÀ-Úa-zà-ú\s]+-\s*[A-Z]{2}"),
    // Contact
    ("telefone", r"\(?\d{2}\)?\s*\d{4,5}-?\d{4}"),
    ("email", r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
    // Dates and times
    ("data_br", r"\d{2}/\d{2}/\d{4}"),
    ("data_iso", r"\d{4}-\d{2}-\d{2}"),
    ("data_compacta", r"\d{2}/\d{2}/\d{2}"),
    ("hora", r"\d{2}:\d{2}(?::\d{2})?"),
    // Money and rates
    ("valor_br", r"R\$\s*\d{1,3}(?:\.\d{3})*(?:,\d{2})?"),
    ("valor_numerico", r"\d{1,3}(?:\.\d{3})*(?:,\d{2})?"),
    ("percentual_simbolo", r"\d{1,3}(?:[.,]\d{1,2})?%"),
    ("percentual_decimal", r"0[.,]\d{1,4}"),
    // Registration status
    (
        "situacao",
        r"SITUA[ÇC][ÃA]O\s+(REGULAR|IRREGULAR|SUSPENS[OA]|ATIVA?|INATIVA?)",
    ),
    (
        "status",
        r"\b(ATIVO|INATIVO|PENDENTE|APROVADO|REJEITADO|CANCELADO)\b",
    ),
];

/// Ordered pattern names tried for each regex-backed field type.
pub fn patterns_for(field_type: FieldType) -> &'static [&'static str] {
    match field_type {
        FieldType::Date => &["data_br", "data_iso", "data_compacta"],
        FieldType::Currency => &["valor_br", "valor_numerico"],
        FieldType::Percentage => &["percentual_simbolo", "percentual_decimal"],
        FieldType::Phone => &["telefone"],
        FieldType::Cpf => &["cpf"],
        FieldType::Cnpj => &["cnpj"],
        FieldType::Email => &["email"],
        FieldType::Cep => &["cep"],
        FieldType::Number => &["numero_simples", "numero_decimal"],
        FieldType::Enum | FieldType::Simple | FieldType::MultiLine => &[],
    }
}

/// Regex source for a named pattern.
pub fn pattern_source(name: &str) -> Option<&'static str> {
    PATTERNS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, source)| *source)
}

/// All pattern names in the bank.
pub fn pattern_names() -> impl Iterator<Item = &'static str> {
    PATTERNS.iter().map(|(name, _)| *name)
}

/// A value found by a type's combined alternation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub value: String,
    pub pattern: &'static str,
}

#[derive(Debug, Clone)]
struct Alternation {
    regex: Regex,
    names: &'static [&'static str],
}

static COMPILED: Lazy<RwLock<HashMap<&'static str, Regex>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static ALTERNATIONS: Lazy<RwLock<HashMap<FieldType, Option<Alternation>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn compile(source: &str) -> DocexResult<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map_err(|e| DocexError::Internal(format!("invalid pattern {}: {}", source, e)))
}

/// Compiled regex for a named pattern, compiling it on first use.
fn compiled(name: &str) -> DocexResult<Regex> {
    if let Some(regex) = COMPILED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
    {
        return Ok(regex.clone());
    }

    let (key, source) = PATTERNS
        .iter()
        .find(|(n, _)| *n == name)
        .copied()
        .ok_or_else(|| DocexError::validation(format!("Unknown pattern '{}'", name)))?;

    let mut cache = COMPILED.write().unwrap_or_else(PoisonError::into_inner);
    // Another thread may have compiled it while we waited for the write lock.
    if let Some(regex) = cache.get(key) {
        return Ok(regex.clone());
    }
    let regex = compile(source)?;
    cache.insert(key, regex.clone());
    Ok(regex)
}

fn alternation(field_type: FieldType) -> DocexResult<Option<Alternation>> {
    if let Some(entry) = ALTERNATIONS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&field_type)
    {
        return Ok(entry.clone());
    }

    let mut cache = ALTERNATIONS.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(entry) = cache.get(&field_type) {
        return Ok(entry.clone());
    }

    let names = patterns_for(field_type);
    let entry = if names.is_empty() {
        None
    } else {
        let mut parts = Vec::with_capacity(names.len());
        for name in names {
            let source = pattern_source(name)
                .ok_or_else(|| DocexError::Internal(format!("pattern '{}' not in bank", name)))?;
            parts.push(format!("(?P<{}>{})", name, source));
        }
        Some(Alternation {
            regex: compile(&parts.join("|"))?,
            names,
        })
    };
    cache.insert(field_type, entry.clone());
    Ok(entry)
}

/// Apply one named pattern to a line.
///
/// Returns capture group 1 when the pattern has one, otherwise the whole
/// match, trimmed. Blank results count as no match.
pub fn apply_pattern_to_line(line: &str, pattern_name: &str) -> DocexResult<Option<String>> {
    let regex = compiled(pattern_name)?;
    let value = regex.captures(line).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().trim().to_string())
    });
    Ok(value.filter(|v| !v.is_empty()))
}

/// Test a line against every pattern of a field type in one pass.
///
/// Returns `None` when nothing matches or the type has no patterns.
pub fn apply_type_patterns(line: &str, field_type: FieldType) -> DocexResult<Option<PatternMatch>> {
    let Some(alt) = alternation(field_type)? else {
        return Ok(None);
    };
    let Some(caps) = alt.regex.captures(line) else {
        return Ok(None);
    };
    for name in alt.names {
        if let Some(m) = caps.name(name) {
            let value = m.as_str().trim();
            if !value.is_empty() {
                return Ok(Some(PatternMatch {
                    value: value.to_string(),
                    pattern: *name,
                }));
            }
        }
    }
    Ok(None)
}

/// Whether the field type is backed by the pattern bank.
pub fn has_patterns(field_type: FieldType) -> bool {
    !patterns_for(field_type).is_empty()
}
