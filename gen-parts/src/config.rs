//! gen-parts configuration management.

use crate::error::ConfigError;
use crate::text::pronunciation::{PronunciationEntry, PronunciationTable};
use crate::tts::voices::DEFAULT_VOICE_KEY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_SAMPLE_RATE: u32 = 24000;
const DEFAULT_PAD_MS: u32 = 50;
const DEFAULT_LONG_TEXT_CHARS: usize = 400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenPartsConfig {
    /// Folder receiving `parts/` and the chapter metadata
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Chapter metadata path. None means `<output_dir>/chapter_metadata.json`.
    #[serde(default)]
    pub metadata_file: Option<PathBuf>,

    /// Synthesized chunks per part file
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// First chunk (1-based) that gets synthesized
    #[serde(default = "default_resume_offset")]
    pub resume_offset: u64,

    /// Part number to start writing at. None means plan it from the manifest.
    #[serde(default)]
    pub start_part: Option<u32>,

    /// Output sample rate; engine audio must match it
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Silence appended after each synthesized piece
    #[serde(default = "default_pad_ms")]
    pub pad_ms: u32,

    /// Texts at least this long are synthesized clause by clause
    #[serde(default = "default_long_text_chars")]
    pub long_text_chars: usize,

    /// Optional extra boundary on chunk word count
    #[serde(default)]
    pub max_chunk_words: Option<usize>,

    /// Character display name -> engine voice id
    #[serde(default = "default_voices")]
    pub voices: BTreeMap<String, String>,

    /// Literal substitutions applied after cleaning, in order
    #[serde(default)]
    pub pronunciations: Vec<PronunciationEntry>,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Which speech engine to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EngineConfig {
    /// Kokoro ONNX via the `kokoro_onnx` Python package
    Kokoro {
        model: PathBuf,
        voices: PathBuf,
        #[serde(default = "default_speed")]
        speed: f32,
        #[serde(default = "default_lang")]
        lang: String,
        #[serde(default = "default_cpu_only")]
        cpu_only: bool,
    },
    /// External program: text on stdin, WAV on stdout
    Command { argv: Vec<String> },
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::Kokoro {
            model: PathBuf::from("models/kokoro-v0_19.onnx"),
            voices: PathBuf::from("models/voices.bin"),
            speed: default_speed(),
            lang: default_lang(),
            cpu_only: default_cpu_only(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output/audiobook_parts")
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_resume_offset() -> u64 {
    1
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_pad_ms() -> u32 {
    DEFAULT_PAD_MS
}

fn default_long_text_chars() -> usize {
    DEFAULT_LONG_TEXT_CHARS
}

fn default_voices() -> BTreeMap<String, String> {
    BTreeMap::from([(DEFAULT_VOICE_KEY.to_string(), "am_michael".to_string())])
}

fn default_speed() -> f32 {
    1.0
}

fn default_lang() -> String {
    "en-us".to_string()
}

fn default_cpu_only() -> bool {
    true
}

impl Default for GenPartsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            metadata_file: None,
            batch_size: default_batch_size(),
            resume_offset: default_resume_offset(),
            start_part: None,
            sample_rate: default_sample_rate(),
            pad_ms: default_pad_ms(),
            long_text_chars: default_long_text_chars(),
            max_chunk_words: None,
            voices: default_voices(),
            pronunciations: Vec::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl GenPartsConfig {
    /// Get the config file path: ~/.config/cli-programs/gen-parts.toml
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cli-programs")
            .join("gen-parts.toml")
    }

    /// Load config from `path`, or the default location when None.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_toml(&fs::read_to_string(path)?)?,
            None => {
                let path = Self::config_path();
                if !path.exists() {
                    return Ok(Self::default());
                }
                Self::from_toml(&fs::read_to_string(&path)?)?
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.voices.contains_key(DEFAULT_VOICE_KEY) {
            return Err(ConfigError::MissingDefaultVoice(DEFAULT_VOICE_KEY.to_string()));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        if self.resume_offset == 0 {
            return Err(invalid("resume_offset", "chunks are numbered from 1"));
        }
        if self.start_part == Some(0) {
            return Err(invalid("start_part", "parts are numbered from 1"));
        }
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if self.max_chunk_words == Some(0) {
            return Err(invalid("max_chunk_words", "must be at least 1 when set"));
        }
        if let EngineConfig::Command { argv } = &self.engine {
            if argv.is_empty() {
                return Err(invalid("engine.argv", "needs at least a program name"));
            }
        }

        PronunciationTable::new(self.pronunciations.clone())?;
        Ok(())
    }

    /// Build the pronunciation table, warning on replacements that the
    /// normalizer would rewrite again.
    pub fn pronunciation_table(&self) -> Result<PronunciationTable, ConfigError> {
        let table = PronunciationTable::new(self.pronunciations.clone())?;
        for entry in table.unstable_entries() {
            log::warn!(
                "pronunciation for \"{}\" (\"{}\") is rewritten by text cleaning; output is not idempotent",
                entry.from,
                entry.to
            );
        }
        Ok(table)
    }

    pub fn parts_dir(&self) -> PathBuf {
        self.output_dir.join("parts")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("chapter_metadata.json"))
    }

    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join("parts.zip")
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GenPartsConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.resume_offset, 1);
        assert_eq!(config.sample_rate, 24000);
        assert_eq!(config.pad_ms, 50);
        assert!(config.start_part.is_none());
        assert_eq!(config.voices.get("Narrator").map(String::as_str), Some("am_michael"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = GenPartsConfig::config_path();
        assert!(path.ends_with("cli-programs/gen-parts.toml"));
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
output_dir = "/tmp/book"
batch_size = 10
resume_offset = 41
start_part = 5

[voices]
Narrator = "am_michael"
Alice = "af_aoede"

[[pronunciations]]
from = "Hermione"
to = "Her my oh nee"

[engine]
kind = "command"
argv = ["piper", "--voice", "{voice}"]
"#;
        let config = GenPartsConfig::from_toml(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.output_dir, PathBuf::from("/tmp/book"));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.resume_offset, 41);
        assert_eq!(config.start_part, Some(5));
        assert_eq!(config.voices.len(), 2);
        assert_eq!(config.pronunciations[0].to, "Her my oh nee");
        assert_eq!(
            config.engine,
            EngineConfig::Command {
                argv: vec!["piper".into(), "--voice".into(), "{voice}".into()]
            }
        );
        assert_eq!(config.metadata_path(), PathBuf::from("/tmp/book/chapter_metadata.json"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = GenPartsConfig::from_toml("").unwrap();
        assert_eq!(config.batch_size, 100);
        assert!(matches!(config.engine, EngineConfig::Kokoro { .. }));
    }

    #[test]
    fn test_parse_kokoro_engine_defaults() {
        let toml_str = r#"
[engine]
kind = "kokoro"
model = "m.onnx"
voices = "v.bin"
"#;
        let config = GenPartsConfig::from_toml(toml_str).unwrap();
        match config.engine {
            EngineConfig::Kokoro { speed, lang, cpu_only, .. } => {
                assert_eq!(speed, 1.0);
                assert_eq!(lang, "en-us");
                assert!(cpu_only);
            }
            other => panic!("unexpected engine {:?}", other),
        }
    }

    #[test]
    fn test_missing_narrator_rejected() {
        let config = GenPartsConfig::from_toml("[voices]\nAlice = \"af_aoede\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingDefaultVoice(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = GenPartsConfig::default();
        config.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = GenPartsConfig::default();
        config.resume_offset = 0;
        assert!(config.validate().is_err());

        let mut config = GenPartsConfig::default();
        config.start_part = Some(0);
        assert!(config.validate().is_err());

        let mut config = GenPartsConfig::default();
        config.engine = EngineConfig::Command { argv: Vec::new() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pronunciation_collision_rejected() {
        let toml_str = r#"
[[pronunciations]]
from = "Ann"
to = "An"

[[pronunciations]]
from = "Anna"
to = "Ah nah"
"#;
        let config = GenPartsConfig::from_toml(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PronunciationCollision { .. })
        ));
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = GenPartsConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_explicit_path_validates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gen-parts.toml");
        fs::write(&path, "batch_size = 0\n").unwrap();
        assert!(GenPartsConfig::load(Some(&path)).is_err());

        fs::write(&path, "batch_size = 3\n").unwrap();
        assert_eq!(GenPartsConfig::load(Some(&path)).unwrap().batch_size, 3);
    }
}
