//! Error types for configuration loading and speech synthesis.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Voice map has no \"{0}\" entry; it is the fallback for unmapped characters")]
    MissingDefaultVoice(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Pronunciation entries collide: \"{first}\" and \"{second}\" ({reason})")]
    PronunciationCollision {
        first: String,
        second: String,
        reason: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// A resume that would overwrite or split previously written parts.
#[derive(Error, Debug, PartialEq)]
pub enum ResumeError {
    #[error(
        "Resume offset {offset} falls inside part {part:03} (chunks {first_chunk}-{last_chunk}); \
         resume from chunk {first_chunk} or {next}",
        next = .last_chunk + 1
    )]
    InsideRecordedPart {
        offset: u64,
        part: u32,
        first_chunk: u64,
        last_chunk: u64,
    },

    #[error(
        "Part {part:03} holds chunks from {first_chunk}, before resume offset {offset}; \
         starting at part {start_part:03} would overwrite them (use --force to allow)"
    )]
    WouldOverwrite {
        offset: u64,
        start_part: u32,
        part: u32,
        first_chunk: u64,
    },
}

/// Why a chunk produced no audio.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    #[error("Engine failed: {0}")]
    Engine(String),

    #[error("Engine returned no samples")]
    EmptyAudio,

    #[error("Engine produced {actual} Hz audio, expected {expected} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("Engine output is not a readable WAV stream: {0}")]
    InvalidWav(String),
}

impl SynthesisError {
    /// Short label used to group failures in the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            SynthesisError::Engine(_) => "engine",
            SynthesisError::EmptyAudio => "empty-audio",
            SynthesisError::SampleRateMismatch { .. } => "sample-rate",
            SynthesisError::InvalidWav(_) => "invalid-wav",
        }
    }
}
