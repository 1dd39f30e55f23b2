//! Known values from earlier extractions and residual-text reduction.

use indexmap::IndexMap;

use crate::text::{collapse_whitespace, normalize_for_match, remove_first_ignore_case};
use crate::types::{is_present, ExtractorResponse, Schema};

/// Minimum normalized length for a known value to be stripped from text.
const MIN_STRIP_LEN: usize = 2;

/// Field values already known for a document, first value per field wins.
///
/// Field names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownValues(IndexMap<String, String>);

impl KnownValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every present value of `result` whose field is not yet known.
    pub fn absorb(&mut self, result: &ExtractorResponse) {
        for (name, value) in result {
            if !is_present(value) || self.get(name).is_some() {
                continue;
            }
            if let Some(value) = value {
                self.0.insert(name.clone(), value.clone());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .or_else(|| {
                let lowered = name.to_lowercase();
                self.0
                    .iter()
                    .find(|(k, _)| k.to_lowercase() == lowered)
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    /// Schema fields with no known value, in schema order.
    pub fn fields_needed(&self, schema: &Schema) -> Vec<String> {
        schema
            .names()
            .filter(|name| self.get(name).is_none())
            .map(str::to_string)
            .collect()
    }

    /// How many schema fields are already known.
    pub fn count_known(&self, schema: &Schema) -> usize {
        schema.names().filter(|name| self.get(name).is_some()).count()
    }

    /// A full response for `schema` built only from known values.
    pub fn to_response(&self, schema: &Schema) -> ExtractorResponse {
        schema.project(|name| self.get(name).map(str::to_string))
    }

    /// Fresh values win; known values fill the gaps; everything else is null.
    pub fn merge(&self, schema: &Schema, fresh: &ExtractorResponse) -> ExtractorResponse {
        schema.project(|name| {
            fresh
                .get(name)
                .filter(|v| is_present(v))
                .cloned()
                .flatten()
                .or_else(|| self.get(name).map(str::to_string))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KnownValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut known = KnownValues::new();
        for (k, v) in iter {
            let (k, v) = (k.into(), v.into());
            if known.get(&k).is_none() && !v.trim().is_empty() {
                known.0.insert(k, v);
            }
        }
        known
    }
}

/// Strip every known value from `text`, line by line.
///
/// A line that mentions a known value (compared in normalized form) loses
/// that value; the line is dropped when what remains normalizes to fewer
/// than two characters. Lines that mention nothing known are kept verbatim.
/// Runs of blank lines collapse to one and the result is trimmed.
pub fn remove_known_values(text: &str, known: &KnownValues) -> String {
    let values: Vec<(&str, String)> = known
        .values()
        .map(|v| (v.trim(), normalize_for_match(v)))
        .filter(|(_, normalized)| normalized.chars().count() >= MIN_STRIP_LEN)
        .collect();

    let mut kept: Vec<String> = Vec::new();
    for line in text.lines() {
        if line.trim().chars().count() < MIN_STRIP_LEN || values.is_empty() {
            push_line(&mut kept, line.trim_end().to_string());
            continue;
        }

        let mut raw = line.to_string();
        let mut normalized = normalize_for_match(line);
        let mut touched = false;

        for (value, normalized_value) in &values {
            if !normalized.contains(normalized_value.as_str()) {
                continue;
            }
            touched = true;
            while let Some(stripped) = remove_first_ignore_case(&raw, value) {
                raw = stripped;
            }
            normalized = normalize_for_match(&raw);
            if normalized.contains(normalized_value.as_str()) {
                // Punctuation or accents differ from the raw value; fall back
                // to the normalized line.
                normalized = collapse_whitespace(&normalized.replace(normalized_value.as_str(), " "));
                raw = normalized.clone();
            }
        }

        if !touched {
            push_line(&mut kept, line.trim_end().to_string());
        } else if normalized.chars().count() >= MIN_STRIP_LEN {
            push_line(&mut kept, collapse_whitespace(&raw));
        }
    }

    kept.join("\n").trim().to_string()
}

fn push_line(lines: &mut Vec<String>, line: String) {
    let blank = line.trim().is_empty();
    if blank && lines.last().is_some_and(|l| l.trim().is_empty()) {
        return;
    }
    lines.push(line);
}
