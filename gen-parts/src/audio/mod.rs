//! Audio output: part batching, chapter metadata and the transfer archive.

pub mod archive;
pub mod batcher;
pub mod metadata;

pub use batcher::PartBatcher;
