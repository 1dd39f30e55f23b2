//! Text normalization helpers shared by the extractor and the cache.

use std::ops::Range;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Remove diacritics: decompose, drop combining marks, recompose.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Collapse every whitespace run into one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison form: no diacritics, lowercase, letters/digits/whitespace only.
pub fn normalize_for_match(text: &str) -> String {
    let folded: String = strip_diacritics(text)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    collapse_whitespace(&folded)
}

/// Byte range of the first case-insensitive occurrence of `needle`.
///
/// Compares char by char with simple case folding, so ranges stay on char
/// boundaries of `haystack` even when upper and lower forms differ in
/// length.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<Range<usize>> {
    let first = needle.chars().next()?;
    haystack
        .char_indices()
        .filter(|(_, c)| same_ignoring_case(*c, first))
        .find_map(|(start, _)| match_at(haystack, start, needle))
}

fn match_at(haystack: &str, start: usize, needle: &str) -> Option<Range<usize>> {
    let mut rest = haystack[start..].char_indices();
    let mut end = start;
    for n in needle.chars() {
        let (offset, h) = rest.next()?;
        if !same_ignoring_case(h, n) {
            return None;
        }
        end = start + offset + h.len_utf8();
    }
    Some(start..end)
}

fn same_ignoring_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Remove the first case-insensitive occurrence of `needle`, if any.
pub fn remove_first_ignore_case(haystack: &str, needle: &str) -> Option<String> {
    let range = find_ignore_case(haystack, needle)?;
    let mut out = String::with_capacity(haystack.len() - range.len());
    out.push_str(&haystack[..range.start]);
    out.push_str(&haystack[range.end..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("Situação Endereço"), "Situacao Endereco");
        assert_eq!(strip_diacritics("plain"), "plain");
    }

    #[test]
    fn test_normalize_for_match() {
        assert_eq!(normalize_for_match("  CPF: 123.456.789-00 "), "cpf 12345678900");
        assert_eq!(normalize_for_match("São   Paulo"), "sao paulo");
    }

    #[test]
    fn test_find_ignore_case_handles_regex_metacharacters() {
        let line = "Valor: R$ 1.000,00 (mil)";
        assert_eq!(find_ignore_case(line, "r$ 1.000,00"), Some(7..18));
        assert_eq!(find_ignore_case(line, "R$ 2.000,00"), None);
        assert_eq!(find_ignore_case(line, ""), None);
    }

    #[test]
    fn test_find_ignore_case_with_accents() {
        assert_eq!(find_ignore_case("SITUAÇÃO: ok", "situação"), Some(0..10));
        assert_eq!(find_ignore_case("Nome: joão", "JOÃO"), Some(6..11));
        assert_eq!(find_ignore_case("ab", "abc"), None);
    }

    #[test]
    fn test_remove_first_ignore_case() {
        assert_eq!(
            remove_first_ignore_case("Situação: regular regular", "REGULAR").as_deref(),
            Some("Situação:  regular")
        );
    }
}
