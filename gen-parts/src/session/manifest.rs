//! Part manifest: which chunks each written part covers, for safe resumes.

use crate::error::ResumeError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";

/// One flushed part file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    /// Part number
    pub part: u32,
    /// File name inside the parts folder
    pub file: String,
    /// Sequence number of the first chunk in the part
    pub first_chunk: u64,
    /// Sequence number of the last chunk in the part
    pub last_chunk: u64,
    /// Number of chunk segments concatenated
    pub segments: usize,
    /// Total samples, padding included
    pub samples: usize,
    pub duration_secs: f64,
    pub written_at: DateTime<Utc>,
}

/// All parts written into one parts folder, ordered by part number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartManifest {
    pub updated_at: DateTime<Utc>,
    pub parts: Vec<PartRecord>,
    #[serde(skip)]
    path: PathBuf,
}

impl PartManifest {
    /// Path of the manifest inside a parts folder.
    pub fn path_in(parts_dir: &Path) -> PathBuf {
        parts_dir.join(MANIFEST_FILE)
    }

    /// Load the manifest of `parts_dir`, or an empty one if there is none yet.
    pub fn load(parts_dir: &Path) -> Result<Self> {
        let path = Self::path_in(parts_dir);

        if !path.exists() {
            return Ok(Self {
                updated_at: Utc::now(),
                parts: Vec::new(),
                path,
            });
        }

        let file = File::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut manifest: PartManifest = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        manifest.path = path;
        Ok(manifest)
    }

    /// Save the manifest to disk.
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.updated_at = Utc::now();

        let file = File::create(&self.path).context("Failed to create manifest file")?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("Failed to write manifest JSON")?;
        Ok(())
    }

    /// Add or replace the entry for `record.part`.
    pub fn record(&mut self, record: PartRecord) {
        self.parts.retain(|p| p.part != record.part);
        self.parts.push(record);
        self.parts.sort_by_key(|p| p.part);
    }

    /// Drop entries numbered above `last_part`, returning them.
    pub fn truncate_after(&mut self, last_part: u32) -> Vec<PartRecord> {
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.parts)
            .into_iter()
            .partition(|p| p.part <= last_part);
        self.parts = kept;
        dropped
    }

    /// Pick the part number a run resuming at chunk `resume_offset` starts at.
    ///
    /// Without an explicit start part, the run continues after the last part
    /// lying wholly before the offset, and an offset in the middle of a part is
    /// refused. An explicit start part is refused when it would overwrite
    /// chunks before the offset, unless `force` is set.
    pub fn plan_start_part(
        &self,
        resume_offset: u64,
        explicit: Option<u32>,
        force: bool,
    ) -> Result<u32, ResumeError> {
        let Some(start_part) = explicit else {
            if let Some(p) = self
                .parts
                .iter()
                .find(|p| p.first_chunk < resume_offset && resume_offset <= p.last_chunk)
            {
                return Err(ResumeError::InsideRecordedPart {
                    offset: resume_offset,
                    part: p.part,
                    first_chunk: p.first_chunk,
                    last_chunk: p.last_chunk,
                });
            }

            return Ok(self
                .parts
                .iter()
                .filter(|p| p.last_chunk < resume_offset)
                .map(|p| p.part + 1)
                .max()
                .unwrap_or(1));
        };

        for p in self.parts.iter().filter(|p| p.part >= start_part) {
            if p.first_chunk < resume_offset && !force {
                return Err(ResumeError::WouldOverwrite {
                    offset: resume_offset,
                    start_part,
                    part: p.part,
                    first_chunk: p.first_chunk,
                });
            }
        }

        for p in self.parts.iter().filter(|p| p.part < start_part) {
            if p.last_chunk >= resume_offset {
                log::warn!(
                    "part {:03} already holds chunks up to {}; chunks from {} will be voiced twice",
                    p.part,
                    p.last_chunk,
                    resume_offset
                );
            }
        }

        Ok(start_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(part: u32, first_chunk: u64, last_chunk: u64) -> PartRecord {
        PartRecord {
            part,
            file: format!("part_{:03}.wav", part),
            first_chunk,
            last_chunk,
            segments: (last_chunk - first_chunk + 1) as usize,
            samples: 1000,
            duration_secs: 1.0,
            written_at: Utc::now(),
        }
    }

    fn manifest(parts: Vec<PartRecord>) -> PartManifest {
        PartManifest {
            updated_at: Utc::now(),
            parts,
            path: PathBuf::from("/tmp/unused/manifest.json"),
        }
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = PartManifest::load(dir.path()).unwrap();
        assert!(manifest.parts.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut manifest = PartManifest::load(&dir.path().join("parts")).unwrap();
        manifest.record(record(2, 101, 200));
        manifest.record(record(1, 1, 100));
        manifest.save().unwrap();

        let reloaded = PartManifest::load(&dir.path().join("parts")).unwrap();
        let numbers: Vec<u32> = reloaded.parts.iter().map(|p| p.part).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(reloaded.parts[1].first_chunk, 101);
    }

    #[test]
    fn test_record_replaces_same_part() {
        let mut m = manifest(vec![record(1, 1, 100)]);
        m.record(record(1, 1, 50));
        assert_eq!(m.parts.len(), 1);
        assert_eq!(m.parts[0].last_chunk, 50);
    }

    #[test]
    fn test_truncate_after() {
        let mut m = manifest(vec![record(1, 1, 3), record(2, 4, 6), record(3, 3, 3)]);
        let dropped = m.truncate_after(2);
        assert_eq!(dropped.iter().map(|p| p.part).collect::<Vec<_>>(), vec![3]);
        assert_eq!(m.parts.len(), 2);
        assert!(m.truncate_after(2).is_empty());
    }

    #[test]
    fn test_plan_fresh_run() {
        let m = manifest(Vec::new());
        assert_eq!(m.plan_start_part(1, None, false), Ok(1));
        assert_eq!(m.plan_start_part(1, Some(4), false), Ok(4));
    }

    #[test]
    fn test_plan_continues_after_complete_parts() {
        let m = manifest(vec![record(1, 1, 100), record(2, 101, 200)]);
        assert_eq!(m.plan_start_part(201, None, false), Ok(3));
        assert_eq!(m.plan_start_part(101, None, false), Ok(2));
        assert_eq!(m.plan_start_part(1, None, false), Ok(1));
    }

    #[test]
    fn test_plan_skips_gap_of_dropped_chunks() {
        // Chunk 101 failed, so part 2 starts at 102
        let m = manifest(vec![record(1, 1, 100), record(2, 102, 200)]);
        assert_eq!(m.plan_start_part(101, None, false), Ok(2));
    }

    #[test]
    fn test_plan_refuses_offset_inside_part() {
        let m = manifest(vec![record(1, 1, 100), record(2, 101, 200)]);
        let err = m.plan_start_part(150, None, false).unwrap_err();
        assert_eq!(
            err,
            ResumeError::InsideRecordedPart {
                offset: 150,
                part: 2,
                first_chunk: 101,
                last_chunk: 200
            }
        );
        assert!(err.to_string().contains("resume from chunk 101 or 201"));
    }

    #[test]
    fn test_plan_explicit_overwrite_refused_unless_forced() {
        let m = manifest(vec![record(1, 1, 100), record(2, 101, 200)]);
        assert!(matches!(
            m.plan_start_part(201, Some(1), false),
            Err(ResumeError::WouldOverwrite { part: 1, .. })
        ));
        assert_eq!(m.plan_start_part(201, Some(1), true), Ok(1));
        assert_eq!(m.plan_start_part(201, Some(3), false), Ok(3));
        assert_eq!(m.plan_start_part(101, Some(2), false), Ok(2));
    }
}
