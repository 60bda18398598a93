// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal ordered INI reader.
//!
//! Sections keep file order (`IndexMap`) so diagnostics can point at the
//! section a value came from. Later files merge key-by-key over earlier
//! ones; within one file a repeated key takes the last value.

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IniError {
    #[error("line {line}: key `{key}` outside any section")]
    KeyOutsideSection { line: usize, key: String },

    #[error("line {line}: expected `key = value`, got `{text}`")]
    Malformed { line: usize, text: String },

    #[error("line {line}: unterminated section header `{text}`")]
    BadHeader { line: usize, text: String },
}

/// Parsed INI document: section name → ordered key/value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, IniError> {
        let mut doc = Document::default();
        let mut current: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| IniError::BadHeader {
                    line,
                    text: trimmed.to_string(),
                })?;
                let name = name.trim().to_string();
                doc.sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(IniError::Malformed { line, text: trimmed.to_string() });
            };
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            let Some(section) = &current else {
                return Err(IniError::KeyOutsideSection { line, key });
            };
            doc.sections
                .entry(section.clone())
                .or_default()
                .insert(key, value);
        }

        Ok(doc)
    }

    /// Merge `other` over `self`, key by key.
    pub fn merge(&mut self, other: Document) {
        for (name, keys) in other.sections {
            let section = self.sections.entry(name).or_default();
            for (key, value) in keys {
                section.insert(key, value);
            }
        }
    }

    pub fn section(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &IndexMap<String, String>)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Fold one section's keys into another (used for host overrides).
    pub fn fold_into(&mut self, from: &str, into: &str) {
        if let Some(overrides) = self.sections.shift_remove(from) {
            let target = self.sections.entry(into.to_string()).or_default();
            for (key, value) in overrides {
                target.insert(key, value);
            }
        }
    }
}

/// Split a comma list, trimming each element and dropping empties.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `1`, `true`, `yes`, `on` → true (case-insensitive); everything else false.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
#[path = "ini_tests.rs"]
mod tests;
