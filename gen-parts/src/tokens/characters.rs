//! Speaker id to character name mapping from the book document.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Name given to speakers with no entry or no text.
pub const UNKNOWN_CHARACTER: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct BookDocument {
    #[serde(default)]
    characters: Vec<CharacterEntry>,
}

#[derive(Debug, Deserialize)]
struct CharacterEntry {
    id: CharacterId,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CharacterId {
    Number(i64),
    Text(String),
}

impl CharacterId {
    fn into_key(self) -> String {
        match self {
            CharacterId::Number(n) => n.to_string(),
            CharacterId::Text(s) => s,
        }
    }
}

/// Immutable speaker id -> display name lookup.
#[derive(Debug, Clone, Default)]
pub struct CharacterMap {
    names: HashMap<String, String>,
}

impl CharacterMap {
    /// Load the map from a book JSON document.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open character file {}", path.display()))?;
        let document: BookDocument = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse character file {}", path.display()))?;
        Ok(Self::from_document(document))
    }

    /// Parse the map from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: BookDocument =
            serde_json::from_str(json).context("Failed to parse character document")?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: BookDocument) -> Self {
        let names = document
            .characters
            .into_iter()
            .map(|c| {
                let name = c.text.unwrap_or_else(|| UNKNOWN_CHARACTER.to_string());
                (c.id.into_key(), name)
            })
            .collect();
        Self { names }
    }

    /// Display name for a speaker id.
    pub fn resolve(&self, speaker_id: &str) -> &str {
        self.names
            .get(speaker_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_CHARACTER)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
