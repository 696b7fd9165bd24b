//! Chapter marker metadata for the M4B stitcher.

use crate::text::ChapterMarker;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the chapter markers as a JSON array of `{title, start}` objects.
pub fn write_chapter_metadata(markers: &[ChapterMarker], output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = File::create(output_path).context("Failed to create metadata file")?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, markers).context("Failed to write chapter metadata")?;
    writer.flush()?;

    Ok(())
}

/// Read a chapter metadata file back.
#[cfg(test)]
pub fn read_chapter_metadata(path: &Path) -> Result<Vec<ChapterMarker>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open chapter metadata {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file)).context("Failed to parse chapter metadata")
}
