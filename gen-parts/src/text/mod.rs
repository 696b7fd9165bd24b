//! Text processing for TTS: segmentation, cleaning, pronunciation and chapter detection.

pub mod chapters;
pub mod chunker;
pub mod normalizer;
pub mod pronunciation;

pub use chapters::{ChapterDetector, ChapterMarker};
pub use chunker::{Chunk, Segmenter};
pub use normalizer::Normalizer;
