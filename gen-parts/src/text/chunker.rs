//! Groups the token stream into utterance chunks.

use crate::tokens::TokenRecord;

/// Words that close the chunk they appear in.
pub const SENTENCE_TERMINATORS: &[&str] = &[".", "!", "?", "\u{201d}", "\u{2019}"];

/// A finished run of words from one paragraph and one speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub words: Vec<String>,
    pub paragraph_id: String,
    pub speaker_id: String,
}

impl Chunk {
    /// Words joined with single spaces, ready for normalization.
    pub fn joined(&self) -> String {
        self.words.join(" ")
    }
}

/// Chunk accumulator.
///
/// The word that triggers a boundary belongs to the chunk it closes, even when
/// the boundary is a paragraph or speaker change. An empty chunk takes its
/// ownership from the record that opens it.
#[derive(Debug, Default)]
pub struct Segmenter {
    words: Vec<String>,
    owner: Option<(String, String)>,
    max_words: Option<usize>,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also close a chunk once it holds more than `max_words` words.
    pub fn with_max_words(mut self, max_words: Option<usize>) -> Self {
        self.max_words = max_words;
        self
    }

    /// Feed one record, returning the chunk it closes, if any.
    pub fn push(&mut self, record: TokenRecord) -> Option<Chunk> {
        let (paragraph_id, speaker_id) = self
            .owner
            .get_or_insert_with(|| (record.paragraph_id.clone(), record.speaker_id.clone()))
            .clone();

        let boundary = record.paragraph_id != paragraph_id
            || record.speaker_id != speaker_id
            || SENTENCE_TERMINATORS.contains(&record.word.as_str())
            || self.max_words.is_some_and(|max| self.words.len() + 1 > max);

        self.words.push(record.word);

        if !boundary {
            return None;
        }

        let chunk = Chunk {
            words: std::mem::take(&mut self.words),
            paragraph_id,
            speaker_id,
        };
        self.owner = None;
        Some(chunk)
    }

    /// Close the trailing chunk at end of stream.
    pub fn finish(&mut self) -> Option<Chunk> {
        if self.words.is_empty() {
            return None;
        }
        let (paragraph_id, speaker_id) = self.owner.take()?;
        Some(Chunk {
            words: std::mem::take(&mut self.words),
            paragraph_id,
            speaker_id,
        })
    }
}
