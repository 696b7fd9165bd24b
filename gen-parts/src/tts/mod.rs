//! TTS engine trait and the synthesis adapter used by the pipeline.

pub mod command;
#[cfg(feature = "kokoro")]
pub mod kokoro;
pub mod voices;

use crate::config::EngineConfig;
use crate::error::SynthesisError;
use anyhow::Result;
use async_trait::async_trait;

/// Samples as returned by an engine, before padding.
#[derive(Debug, Clone)]
pub struct RawAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Padded audio for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// TTS engine trait - all engines implement this.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize text with the given engine voice id.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<RawAudio, SynthesisError>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

/// Create the engine named by the configuration.
pub fn create_engine(config: &EngineConfig) -> Result<Box<dyn SpeechEngine>> {
    match config {
        #[cfg(feature = "kokoro")]
        EngineConfig::Kokoro {
            model,
            voices,
            speed,
            lang,
            cpu_only,
        } => Ok(Box::new(kokoro::KokoroBackend::new(
            model, voices, *speed, lang, *cpu_only,
        )?)),
        #[cfg(not(feature = "kokoro"))]
        EngineConfig::Kokoro { .. } => anyhow::bail!(
            "gen-parts was built without the `kokoro` feature. \
             Rebuild with `--features kokoro` or configure a `command` engine."
        ),
        EngineConfig::Command { argv } => Ok(Box::new(command::CommandBackend::new(argv.clone())?)),
    }
}

/// Wraps an engine with padding, long-text splitting and format checks.
pub struct Synthesizer {
    engine: Box<dyn SpeechEngine>,
    sample_rate: u32,
    pad_ms: u32,
    long_text_chars: usize,
}

impl Synthesizer {
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        sample_rate: u32,
        pad_ms: u32,
        long_text_chars: usize,
    ) -> Self {
        Self {
            engine,
            sample_rate,
            pad_ms,
            long_text_chars,
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Synthesize a chunk's text.
    ///
    /// Long text is spoken clause by clause; clauses that fail are left out.
    /// The chunk only fails when no clause produced audio.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioSegment, SynthesisError> {
        if text.chars().count() < self.long_text_chars {
            return self.synthesize_piece(text, voice).await;
        }

        let mut samples = Vec::new();
        let mut last_error = None;
        for clause in split_clauses(text) {
            match self.synthesize_piece(clause, voice).await {
                Ok(segment) => samples.extend(segment.samples),
                Err(e) => {
                    log::debug!("clause dropped ({}): {:?}", e, clause);
                    last_error = Some(e);
                }
            }
        }

        if samples.is_empty() {
            return Err(last_error.unwrap_or(SynthesisError::EmptyAudio));
        }
        Ok(AudioSegment {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    async fn synthesize_piece(&self, text: &str, voice: &str) -> Result<AudioSegment, SynthesisError> {
        let raw = self.engine.synthesize(text, voice).await?;

        if raw.sample_rate != self.sample_rate {
            return Err(SynthesisError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: raw.sample_rate,
            });
        }
        if raw.samples.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        let mut samples = raw.samples;
        samples.resize(samples.len() + pad_samples(raw.sample_rate, self.pad_ms), 0.0);
        Ok(AudioSegment {
            samples,
            sample_rate: raw.sample_rate,
        })
    }
}

/// Number of zero samples in a `pad_ms` silence at `sample_rate`.
pub fn pad_samples(sample_rate: u32, pad_ms: u32) -> usize {
    (u64::from(sample_rate) * u64::from(pad_ms) / 1000) as usize
}

/// Split after each `,` and `;`, dropping pieces with nothing to say.
fn split_clauses(text: &str) -> Vec<&str> {
    text.split_inclusive([',', ';'])
        .map(str::trim)
        .filter(|piece| piece.chars().any(char::is_alphanumeric))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::testing::FakeEngine;
    use super::*;

    fn synthesizer(engine: FakeEngine, long_text_chars: usize) -> Synthesizer {
        Synthesizer::new(Box::new(engine), 24000, 50, long_text_chars)
    }

    #[test]
    fn test_pad_samples() {
        assert_eq!(pad_samples(24000, 50), 1200);
        assert_eq!(pad_samples(22050, 50), 1102);
        assert_eq!(pad_samples(24000, 0), 0);
    }

    #[test]
    fn test_split_clauses() {
        assert_eq!(split_clauses("One, two; three"), vec!["One,", "two;", "three"]);
        assert_eq!(split_clauses("Yes, , no;"), vec!["Yes,", "no;"]);
    }

    #[test]
    fn test_duration() {
        let segment = AudioSegment {
            samples: vec![0.0; 36000],
            sample_rate: 24000,
        };
        assert!((segment.duration_secs() - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_pads_successful_audio() {
        let s = synthesizer(FakeEngine::new(24000, 10), 400);
        let segment = s.synthesize("Hello", "am_michael").await.unwrap();
        assert_eq!(segment.samples.len(), 50 + 1200);
        assert!(segment.samples[50..].iter().all(|&x| x == 0.0));
        assert_eq!(segment.sample_rate, 24000);
    }

    #[tokio::test]
    async fn test_engine_failure_is_explicit() {
        let s = synthesizer(FakeEngine::new(24000, 10), 400);
        let err = s.synthesize("FAIL here", "v").await.unwrap_err();
        assert_eq!(err.kind(), "engine");
    }

    #[tokio::test]
    async fn test_sample_rate_mismatch() {
        let s = synthesizer(FakeEngine::new(22050, 10), 400);
        let err = s.synthesize("Hello", "v").await.unwrap_err();
        assert_eq!(
            err,
            SynthesisError::SampleRateMismatch {
                expected: 24000,
                actual: 22050
            }
        );
    }

    #[tokio::test]
    async fn test_empty_audio_is_failure() {
        let s = synthesizer(FakeEngine::new(24000, 0), 400);
        assert_eq!(
            s.synthesize("Hello", "v").await.unwrap_err(),
            SynthesisError::EmptyAudio
        );
    }

    #[tokio::test]
    async fn test_long_text_is_split_into_clauses() {
        let engine = FakeEngine::new(24000, 1);
        let calls = engine.calls.clone();
        let s = synthesizer(engine, 10);

        let segment = s.synthesize("First part, FAIL part; last part", "v").await.unwrap();

        let spoken: Vec<String> = calls.lock().unwrap().iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(spoken, vec!["First part,", "FAIL part;", "last part"]);
        // Two surviving clauses, each padded
        assert_eq!(segment.samples.len(), 11 + 1200 + 9 + 1200);
    }

    #[tokio::test]
    async fn test_long_text_all_clauses_fail() {
        let s = synthesizer(FakeEngine::new(24000, 1), 5);
        let err = s.synthesize("FAIL one, FAIL two", "v").await.unwrap_err();
        assert_eq!(err.kind(), "engine");
    }
}
