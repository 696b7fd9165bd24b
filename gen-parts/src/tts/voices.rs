//! Character name to engine voice lookup.

use crate::error::ConfigError;
use std::collections::BTreeMap;

/// Voice map key every configuration must define.
pub const DEFAULT_VOICE_KEY: &str = "Narrator";

#[derive(Debug, Clone)]
pub struct VoiceResolver {
    voices: BTreeMap<String, String>,
    default_voice: String,
}

impl VoiceResolver {
    pub fn new(voices: BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let default_voice = voices
            .get(DEFAULT_VOICE_KEY)
            .cloned()
            .ok_or_else(|| ConfigError::MissingDefaultVoice(DEFAULT_VOICE_KEY.to_string()))?;
        Ok(Self {
            voices,
            default_voice,
        })
    }

    /// Voice for a character display name.
    ///
    /// Exact names win, then the longest configured name contained in the
    /// display name ("Harry" matches "Harry Potter"), then the narrator.
    /// Equally long names are taken in key order.
    pub fn voice_for(&self, name: &str) -> &str {
        if let Some(voice) = self.voices.get(name) {
            return voice;
        }

        self.voices
            .iter()
            .filter(|(key, _)| !key.is_empty() && name.contains(key.as_str()))
            .rev()
            .max_by_key(|(key, _)| key.len())
            .map(|(_, voice)| voice.as_str())
            .unwrap_or(self.default_voice.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> VoiceResolver {
        VoiceResolver::new(BTreeMap::from([
            ("Narrator".to_string(), "am_michael".to_string()),
            ("Harry".to_string(), "am_puck".to_string()),
            ("Harry Potter".to_string(), "am_adam".to_string()),
            ("Hermione".to_string(), "af_aoede".to_string()),
        ]))
        .unwrap()
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(resolver().voice_for("Hermione"), "af_aoede");
        assert_eq!(resolver().voice_for("Harry"), "am_puck");
    }

    #[test]
    fn test_substring_prefers_longest_key() {
        assert_eq!(resolver().voice_for("Harry Potter Sr."), "am_adam");
        assert_eq!(resolver().voice_for("Young Harry"), "am_puck");
    }

    #[test]
    fn test_equal_length_substrings_take_first_key() {
        let resolver = VoiceResolver::new(BTreeMap::from([
            ("Narrator".to_string(), "am_michael".to_string()),
            ("Ann".to_string(), "v_ann".to_string()),
            ("Bob".to_string(), "v_bob".to_string()),
        ]))
        .unwrap();
        assert_eq!(resolver.voice_for("Ann and Bob"), "v_ann");
        assert_eq!(resolver.voice_for("Bob and Ann"), "v_ann");
    }

    #[test]
    fn test_unknown_falls_back_to_narrator() {
        assert_eq!(resolver().voice_for("Unknown"), "am_michael");
        assert_eq!(resolver().voice_for(""), "am_michael");
    }

    #[test]
    fn test_requires_narrator() {
        let result = VoiceResolver::new(BTreeMap::from([("Ron".to_string(), "x".to_string())]));
        assert!(matches!(result, Err(ConfigError::MissingDefaultVoice(_))));
    }
}
