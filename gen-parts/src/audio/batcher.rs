//! Batches synthesized segments into numbered WAV part files.

use crate::session::PartRecord;
use crate::tts::AudioSegment;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// File name of a part: `part_007.wav`.
pub fn part_file_name(part: u32) -> String {
    format!("part_{:03}.wav", part)
}

/// Path of a part file inside `parts_dir`.
pub fn part_path(parts_dir: &Path, part: u32) -> PathBuf {
    parts_dir.join(part_file_name(part))
}

/// Accumulates segments and writes one part file per `batch_size` segments.
pub struct PartBatcher {
    parts_dir: PathBuf,
    batch_size: usize,
    sample_rate: u32,
    next_part: u32,
    pending: Vec<AudioSegment>,
    first_chunk: u64,
    last_chunk: u64,
}

impl PartBatcher {
    /// Create a batcher writing into `parts_dir`, starting at `start_part`.
    pub fn new(parts_dir: &Path, batch_size: usize, sample_rate: u32, start_part: u32) -> Result<Self> {
        std::fs::create_dir_all(parts_dir)
            .with_context(|| format!("Failed to create {}", parts_dir.display()))?;
        Ok(Self {
            parts_dir: parts_dir.to_path_buf(),
            batch_size: batch_size.max(1),
            sample_rate,
            next_part: start_part,
            pending: Vec::with_capacity(batch_size),
            first_chunk: 0,
            last_chunk: 0,
        })
    }

    /// Part number the next flush will write.
    pub fn next_part(&self) -> u32 {
        self.next_part
    }

    /// Add the audio of chunk `chunk`. Writes a part once the batch is full.
    pub fn push(&mut self, chunk: u64, segment: AudioSegment) -> Result<Option<PartRecord>> {
        if self.pending.is_empty() {
            self.first_chunk = chunk;
        }
        self.last_chunk = chunk;
        self.pending.push(segment);

        if self.pending.len() >= self.batch_size {
            return self.flush().map(Some);
        }
        Ok(None)
    }

    /// Write whatever is left, regardless of batch size.
    pub fn finish(&mut self) -> Result<Option<PartRecord>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        self.flush().map(Some)
    }

    fn flush(&mut self) -> Result<PartRecord> {
        let part = self.next_part;
        let path = part_path(&self.parts_dir, part);
        let segments = std::mem::take(&mut self.pending);

        let samples = write_wav(&path, &segments, self.sample_rate)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let record = PartRecord {
            part,
            file: part_file_name(part),
            first_chunk: self.first_chunk,
            last_chunk: self.last_chunk,
            segments: segments.len(),
            samples,
            duration_secs: samples as f64 / self.sample_rate as f64,
            written_at: Utc::now(),
        };

        log::info!(
            "Saved part {:03} ({} chunks, {:.1}s)",
            part,
            record.segments,
            record.duration_secs
        );

        self.next_part += 1;
        Ok(record)
    }
}

/// Concatenate segments in order into a mono 16-bit PCM WAV file.
///
/// Returns the number of samples written.
fn write_wav(path: &Path, segments: &[AudioSegment], sample_rate: u32) -> Result<usize> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;

    let mut written = 0;
    for sample in segments.iter().flat_map(|s| s.samples.iter()) {
        writer.write_sample(to_pcm16(*sample))?;
        written += 1;
    }
    writer.finalize()?;

    Ok(written)
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
