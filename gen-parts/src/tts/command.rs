//! External-program TTS backend.
//!
//! Runs a configured command per chunk, writing the text to its stdin and
//! reading a WAV file from its stdout. `{voice}` in any argument is replaced
//! with the chunk's voice id.

use super::{RawAudio, SpeechEngine};
use crate::error::SynthesisError;
use anyhow::Result;
use async_trait::async_trait;
use std::io::Cursor;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const VOICE_PLACEHOLDER: &str = "{voice}";

pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        let mut argv = argv.into_iter();
        let program = argv
            .next()
            .ok_or_else(|| anyhow::anyhow!("Engine command is empty"))?;
        Ok(Self {
            program,
            args: argv.collect(),
        })
    }

    fn args_for(&self, voice: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace(VOICE_PLACEHOLDER, voice))
            .collect()
    }
}

#[async_trait]
impl SpeechEngine for CommandBackend {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<RawAudio, SynthesisError> {
        let mut child = Command::new(&self.program)
            .args(self.args_for(voice))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SynthesisError::Engine(format!("Failed to run {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| SynthesisError::Engine(format!("Failed to write text: {}", e)))?;
            // stdin is closed when dropped here
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SynthesisError::Engine(format!("Failed to wait for {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SynthesisError::Engine(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        decode_wav(&output.stdout)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Decode mono or interleaved WAV bytes into mono float samples.
pub fn decode_wav(bytes: &[u8]) -> Result<RawAudio, SynthesisError> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| SynthesisError::InvalidWav(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| SynthesisError::InvalidWav(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| SynthesisError::InvalidWav(e.to_string()))?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(RawAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}
