//! Run state, part manifest and the generation pass.

mod context;
mod manifest;
pub mod pipeline;

pub use manifest::{PartManifest, PartRecord};
pub use pipeline::{Pipeline, RunReport};
