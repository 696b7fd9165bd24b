//! The single sequential generation pass.

use super::context::RunContext;
use super::manifest::{PartManifest, PartRecord};
use crate::audio::PartBatcher;
use crate::audio::metadata::write_chapter_metadata;
use crate::config::GenPartsConfig;
use crate::text::{ChapterDetector, ChapterMarker, Chunk, Normalizer, Segmenter};
use crate::tokens::{CharacterMap, TokenRecord};
use crate::tts::voices::VoiceResolver;
use crate::tts::{SpeechEngine, Synthesizer};
use anyhow::Result;
use std::path::PathBuf;

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub context: RunContext,
    pub chapters: Vec<ChapterMarker>,
    /// Parts written by this run, in order
    pub parts: Vec<PartRecord>,
    /// Every part the parts folder now holds
    pub manifest: PartManifest,
    pub metadata_path: PathBuf,
}

/// Everything a run mutates, owned by the pass.
struct RunState {
    ctx: RunContext,
    batcher: PartBatcher,
    manifest: PartManifest,
    chapters: ChapterDetector,
    parts: Vec<PartRecord>,
}

impl RunState {
    fn record_part(&mut self, part: PartRecord) -> Result<()> {
        self.manifest.record(part.clone());
        self.manifest.save()?;
        self.ctx.parts_written += 1;
        self.parts.push(part);
        Ok(())
    }
}

pub struct Pipeline {
    characters: CharacterMap,
    voices: VoiceResolver,
    normalizer: Normalizer,
    synthesizer: Synthesizer,
    resume_offset: u64,
    max_chunk_words: Option<usize>,
    batch_size: usize,
    sample_rate: u32,
    parts_dir: PathBuf,
    metadata_path: PathBuf,
}

impl Pipeline {
    pub fn new(
        config: &GenPartsConfig,
        characters: CharacterMap,
        engine: Box<dyn SpeechEngine>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            characters,
            voices: VoiceResolver::new(config.voices.clone())?,
            normalizer: Normalizer::new(config.pronunciation_table()?),
            synthesizer: Synthesizer::new(
                engine,
                config.sample_rate,
                config.pad_ms,
                config.long_text_chars,
            ),
            resume_offset: config.resume_offset,
            max_chunk_words: config.max_chunk_words,
            batch_size: config.batch_size,
            sample_rate: config.sample_rate,
            parts_dir: config.parts_dir(),
            metadata_path: config.metadata_path(),
        })
    }

    /// Run the whole token stream through segmentation, synthesis and batching,
    /// then write the chapter metadata.
    ///
    /// `on_progress` is called after every finalized chunk.
    pub async fn run<I, F>(
        &self,
        records: I,
        manifest: PartManifest,
        start_part: u32,
        mut on_progress: F,
    ) -> Result<RunReport>
    where
        I: IntoIterator<Item = Result<TokenRecord>>,
        F: FnMut(&RunContext),
    {
        log::info!(
            "Starting generation at chunk {} into part {:03} (engine: {})",
            self.resume_offset,
            start_part,
            self.synthesizer.engine_name()
        );

        let mut state = RunState {
            ctx: RunContext::new(),
            batcher: PartBatcher::new(&self.parts_dir, self.batch_size, self.sample_rate, start_part)?,
            manifest,
            chapters: ChapterDetector::new(),
            parts: Vec::new(),
        };
        let mut segmenter = Segmenter::new().with_max_words(self.max_chunk_words);

        for record in records {
            if let Some(chunk) = segmenter.push(record?) {
                self.process_chunk(&mut state, chunk).await?;
                on_progress(&state.ctx);
            }
        }
        if let Some(chunk) = segmenter.finish() {
            self.process_chunk(&mut state, chunk).await?;
            on_progress(&state.ctx);
        }

        if let Some(part) = state.batcher.finish()? {
            state.record_part(part)?;
        }

        let last_part = state.batcher.next_part().saturating_sub(1);
        let stale = state.manifest.truncate_after(last_part);
        if !stale.is_empty() {
            for part in &stale {
                log::warn!(
                    "{} is left over from an earlier run (chunks {}-{}); dropped from the manifest",
                    part.file,
                    part.first_chunk,
                    part.last_chunk
                );
            }
            state.manifest.save()?;
        }

        let chapters = state.chapters.into_markers();
        write_chapter_metadata(&chapters, &self.metadata_path)?;
        log::info!(
            "{} chapter(s) logged to {}",
            chapters.len(),
            self.metadata_path.display()
        );

        Ok(RunReport {
            context: state.ctx,
            chapters,
            parts: state.parts,
            manifest: state.manifest,
            metadata_path: self.metadata_path.clone(),
        })
    }

    async fn process_chunk(&self, state: &mut RunState, chunk: Chunk) -> Result<()> {
        let sequence = state.ctx.next_chunk();
        if sequence < self.resume_offset {
            state.ctx.discarded += 1;
            return Ok(());
        }

        let text = self.normalizer.normalize(&chunk.joined());
        if text.cleaned.is_empty() {
            state.ctx.skipped_empty += 1;
            return Ok(());
        }

        if let Some(marker) = state.chapters.observe(&text.cleaned, state.ctx.total_duration) {
            log::info!("Chapter \"{}\" at {:.2}s", marker.title, marker.start);
        }

        let spoken = text.spoken;
        if spoken.trim().is_empty() {
            state.ctx.skipped_empty += 1;
            return Ok(());
        }

        let character = self.characters.resolve(&chunk.speaker_id);
        let voice = self.voices.voice_for(character);
        log::debug!(
            "chunk {} (paragraph {}) [{} -> {}]: {}",
            sequence,
            chunk.paragraph_id,
            character,
            voice,
            spoken
        );

        match self.synthesizer.synthesize(&spoken, voice).await {
            Ok(segment) => {
                state.ctx.add_audio(segment.duration_secs());
                if let Some(part) = state.batcher.push(sequence, segment)? {
                    state.record_part(part)?;
                }
            }
            Err(e) => {
                log::warn!("chunk {} dropped ({}): {:?}", sequence, e, spoken);
                state.ctx.record_failure(&e);
            }
        }

        Ok(())
    }
}
