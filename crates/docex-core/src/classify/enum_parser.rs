//! Enumeration values declared in field descriptions.
//!
//! A description such as `"Situação: pode ser REGULAR, IRREGULAR ou SUSPENSA"`
//! declares the closed set `[REGULAR, IRREGULAR, SUSPENSA]`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::find_ignore_case;

/// Phrases that introduce an enumeration, in the order they are tried.
///
/// The classifier detects enums with this same list, so every field it
/// calls `Enum` has a phrase the parser can read values after.
pub(crate) const INDICATOR_PHRASES: &[&str] = &[
    "can be",
    "pode ser",
    "can contain",
    "pode conter",
    "pode incluir",
    "values:",
    "valores:",
    "options:",
    "opções:",
    "opcoes:",
    "types:",
    "tipos:",
    "escolha entre",
];

/// Acronyms that show up in descriptions but are never enum values.
const STOPLIST: &[&str] = &[
    "PDF", "CPF", "CNPJ", "RG", "CEP", "BRASIL", "OAB", "CRM", "CRO", "CRC",
];

static CAPS_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-ZÀÁÂÃÇÉÊÍÓÔÕÚ]{2,}(?:\s+[A-ZÀÁÂÃÇÉÊÍÓÔÕÚ]{2,})*\b").unwrap()
});

/// Candidate enum values from a field description, in order of appearance.
///
/// Returns the values following the first indicator phrase that yields any,
/// without merging across phrases.
pub fn extract_enum_values(description: &str) -> Vec<String> {
    for phrase in INDICATOR_PHRASES {
        let Some(range) = find_ignore_case(description, phrase) else {
            continue;
        };
        let values = caps_values(&description[range.end..]);
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}

fn caps_values(tail: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for m in CAPS_RUN.find_iter(tail) {
        let token = m.as_str().trim();
        if token.chars().count() < 3 || STOPLIST.contains(&token) {
            continue;
        }
        let lowered = token.to_lowercase();
        if values.iter().any(|v| v.to_lowercase() == lowered) {
            continue;
        }
        values.push(token.to_string());
    }
    values
}

/// An enum value located in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMatch {
    pub value: String,
    pub line_index: usize,
}

/// First line (from `start_line` on) that mentions one of `values`.
///
/// Each line is checked for a whole-line case-insensitive equality against
/// every value, then for case-insensitive containment. Containment is plain
/// substring search, so a value glued to a neighbouring word still counts.
/// Earlier lines win over better matches further down. Blank lines are
/// skipped.
pub fn find_best_match<S: AsRef<str>>(
    lines: &[S],
    start_line: usize,
    values: &[String],
) -> Option<EnumMatch> {
    if values.is_empty() {
        return None;
    }
    for (line_index, line) in lines.iter().enumerate().skip(start_line) {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        let lowered = line.to_lowercase();

        let exact = values.iter().find(|v| v.to_lowercase() == lowered);
        let hit = exact.or_else(|| {
            values
                .iter()
                .find(|v| lowered.contains(&v.to_lowercase()))
        });
        if let Some(value) = hit {
            return Some(EnumMatch {
                value: value.clone(),
                line_index,
            });
        }
    }
    None
}
