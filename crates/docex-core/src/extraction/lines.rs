//! Mutable working set of document lines.

use tracing::debug;

use crate::text::{collapse_whitespace, remove_first_ignore_case, strip_diacritics};

/// A trimmed, non-blank line and where it came from in the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingLine {
    pub text: String,
    /// 0-based line number in the raw text.
    pub original_index: usize,
    removed: bool,
}

/// The lines not yet consumed by an extraction stage.
#[derive(Debug, Clone, Default)]
pub struct LineStore {
    lines: Vec<WorkingLine>,
}

impl LineStore {
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .split('\n')
            .enumerate()
            .filter_map(|(original_index, raw)| {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| WorkingLine {
                    text: trimmed.to_string(),
                    original_index,
                    removed: false,
                })
            })
            .collect();
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[WorkingLine] {
        &self.lines
    }

    /// Texts of lines not marked for removal.
    pub fn texts(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| !l.removed)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Remove `value` from the last live line that contains it.
    ///
    /// Only the matched substring goes; a line left empty is marked for
    /// removal. Returns false when no live line contains the value.
    pub fn claim(&mut self, value: &str) -> bool {
        if value.trim().is_empty() {
            return false;
        }
        for line in self.lines.iter_mut().rev().filter(|l| !l.removed) {
            let Some(rest) = remove_first_ignore_case(&line.text, value) else {
                continue;
            };
            let rest = rest.trim();
            if rest.is_empty() {
                line.removed = true;
                line.text.clear();
            } else {
                line.text = rest.to_string();
            }
            debug!(
                line = line.original_index,
                removed = line.removed,
                "Claimed value from line"
            );
            return true;
        }
        false
    }

    /// Drop lines marked for removal. Returns how many went.
    pub fn flush_removals(&mut self) -> usize {
        let marked: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.removed)
            .map(|(i, _)| i)
            .collect();
        for &i in marked.iter().rev() {
            self.lines.remove(i);
        }
        marked.len()
    }

    /// Strip field labels from every line.
    ///
    /// Lines and keywords are lowercased without diacritics. Keywords are
    /// removed longest first; lines left blank are dropped.
    pub fn strip_keywords(&mut self, keywords: &[String]) {
        let mut normalized: Vec<String> = keywords
            .iter()
            .map(|k| strip_diacritics(k.trim()).to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        normalized.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
        normalized.dedup();

        for line in self.lines.iter_mut() {
            let mut text = strip_diacritics(&line.text).to_lowercase();
            for keyword in &normalized {
                if text.contains(keyword.as_str()) {
                    text = text.replace(keyword.as_str(), " ");
                }
            }
            line.text = collapse_whitespace(&text);
            if line.text.is_empty() {
                line.removed = true;
            }
        }
        self.flush_removals();
    }

    /// Live lines joined by newlines.
    pub fn joined(&self) -> String {
        self.texts().join("\n")
    }
}
