//! Literal pronunciation overrides, validated for collisions at load time.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Replace every occurrence of `from` with `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronunciationEntry {
    pub from: String,
    pub to: String,
}

impl PronunciationEntry {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Ordered substitution table.
///
/// Keys never contain one another and no replacement contains a key, so the
/// result does not depend on entry order.
#[derive(Debug, Clone, Default)]
pub struct PronunciationTable {
    entries: Vec<PronunciationEntry>,
}

impl PronunciationTable {
    pub fn new(entries: Vec<PronunciationEntry>) -> Result<Self, ConfigError> {
        for (i, entry) in entries.iter().enumerate() {
            if entry.from.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "pronunciations".to_string(),
                    message: format!("entry {} has an empty \"from\"", i + 1),
                });
            }

            for (j, other) in entries.iter().enumerate() {
                if i != j && other.from.contains(&entry.from) {
                    return Err(ConfigError::PronunciationCollision {
                        first: entry.from.clone(),
                        second: other.from.clone(),
                        reason: "one key contains the other",
                    });
                }
                if entry.to.contains(&other.from) {
                    return Err(ConfigError::PronunciationCollision {
                        first: entry.from.clone(),
                        second: other.from.clone(),
                        reason: "replacement contains a key",
                    });
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn apply(&self, text: &str) -> String {
        let mut text = text.to_string();
        for entry in &self.entries {
            if text.contains(&entry.from) {
                text = text.replace(&entry.from, &entry.to);
            }
        }
        text
    }

    /// Entries whose replacement a second cleaning pass could rewrite.
    ///
    /// Besides replacements that cleaning changes on their own, this flags
    /// replacements that join onto the text around them once substituted: an
    /// empty one, one opening with an apostrophe, `n't` or punctuation, and
    /// one ending in a lone `n` or `n'` word.
    pub fn unstable_entries(&self) -> impl Iterator<Item = &PronunciationEntry> {
        self.entries.iter().filter(|e| is_unstable(&e.to))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_unstable(to: &str) -> bool {
    if to.is_empty() || super::normalizer::clean(to) != to {
        return true;
    }
    if to.starts_with(['\'', '.', ',', '!', '?', ';', ':']) || to.starts_with("n't") {
        return true;
    }
    matches!(to.split_whitespace().last(), Some("n" | "n'"))
}
