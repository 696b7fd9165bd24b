//! Chapter heading detection on cleaned chunk text.

use serde::{Deserialize, Serialize};

const CHAPTER_KEYWORD: &str = "chapter";

/// Headings are short; longer text mentioning the keyword is narration.
const MAX_HEADING_CHARS: usize = 60;

/// A detected heading and where it starts in the concatenated audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMarker {
    pub title: String,
    /// Seconds of audio produced before this heading
    pub start: f64,
}

/// Whether cleaned chunk text looks like a chapter heading.
///
/// Misses headings without the keyword and accepts short sentences that merely
/// mention it.
pub fn is_heading(text: &str) -> bool {
    text.chars().count() < MAX_HEADING_CHARS && text.to_lowercase().contains(CHAPTER_KEYWORD)
}

/// Ordered, append-only list of chapter markers.
#[derive(Debug, Default)]
pub struct ChapterDetector {
    markers: Vec<ChapterMarker>,
}

impl ChapterDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a marker if `text` is a heading. `start` must be the running
    /// duration before this chunk's audio is added.
    pub fn observe(&mut self, text: &str, start: f64) -> Option<&ChapterMarker> {
        if !is_heading(text) {
            return None;
        }
        self.markers.push(ChapterMarker {
            title: text.to_string(),
            start,
        });
        self.markers.last()
    }

    pub fn into_markers(self) -> Vec<ChapterMarker> {
        self.markers
    }
}
