//! Zip bundle of the part files for transfer.

use crate::session::PartManifest;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Part files in `parts_dir`, ordered by part number.
pub fn list_part_files(parts_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut parts: Vec<(u32, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(parts_dir)
        .with_context(|| format!("Failed to read {}", parts_dir.display()))?
    {
        let path = entry?.path();
        let number = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("part_"))
            .and_then(|n| n.strip_suffix(".wav"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(number) = number {
            parts.push((number, path));
        }
    }

    parts.sort_by_key(|(number, _)| *number);
    Ok(parts.into_iter().map(|(_, path)| path).collect())
}

/// Bundle the parts listed in `manifest` into a deflated zip at `archive_path`.
///
/// Part files on disk that the manifest does not list are left out with a
/// warning. Returns the number of files archived.
pub fn archive_parts(parts_dir: &Path, manifest: &PartManifest, archive_path: &Path) -> Result<usize> {
    if manifest.parts.is_empty() {
        anyhow::bail!("No parts recorded in {}", PartManifest::path_in(parts_dir).display());
    }

    let listed: Vec<PathBuf> = manifest.parts.iter().map(|p| parts_dir.join(&p.file)).collect();
    if let Some(missing) = listed.iter().find(|path| !path.exists()) {
        anyhow::bail!("Part file listed in the manifest is missing: {}", missing.display());
    }
    for extra in list_part_files(parts_dir)?.iter().filter(|path| !listed.contains(path)) {
        log::warn!("{} is not in the manifest; leaving it out of the archive", extra.display());
    }

    let file = File::create(archive_path)
        .with_context(|| format!("Failed to create {}", archive_path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (record, path) in manifest.parts.iter().zip(&listed) {
        zip.start_file(record.file.as_str(), options)?;
        let mut source = File::open(path)?;
        std::io::copy(&mut source, &mut zip)?;
    }
    zip.finish()?;

    log::info!("Archived {} part(s) to {}", listed.len(), archive_path.display());
    Ok(listed.len())
}
