//! Text cleaning before TTS: reflows tokenized words into speakable text.

use super::pronunciation::PronunciationTable;
use once_cell::sync::Lazy;
use regex::Regex;

/// Curly apostrophes and their replacement.
const APOSTROPHES: &[(char, &str)] = &[
    ('\u{2018}', "'"), // Left single quote
    ('\u{2019}', "'"), // Right single quote
];

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_SPACED_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+('[a-zA-Z]+)").unwrap());
static RE_SPACED_NEGATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+(n't)").unwrap());
static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.,!?;:])").unwrap());

/// Clean joined chunk words without pronunciation overrides.
///
/// In order:
/// - curly apostrophes become straight ones
/// - hyphens become spaces, so compounds are not spelled out
/// - whitespace runs collapse and the ends are trimmed
/// - contraction/possessive suffixes split off by the tokenizer are re-attached
/// - spaces before `. , ! ? ; :` are dropped
pub fn clean(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        match APOSTROPHES.iter().find(|(ch, _)| *ch == c) {
            Some((_, r)) => result.push_str(r),
            None if c == '-' => result.push(' '),
            None => result.push(c),
        }
    }

    let result = RE_WHITESPACE.replace_all(&result, " ");
    let result = result.trim();
    let result = RE_SPACED_SUFFIX.replace_all(result, "$1");
    let result = RE_SPACED_NEGATION.replace_all(&result, "$1");
    let result = RE_SPACE_BEFORE_PUNCT.replace_all(&result, "$1");

    result.into_owned()
}

/// Text of one chunk after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Cleaned text, used for chapter detection
    pub cleaned: String,
    /// Cleaned text with pronunciation overrides, sent to the engine
    pub spoken: String,
}

/// Cleaning plus pronunciation overrides.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    pronunciations: PronunciationTable,
}

impl Normalizer {
    pub fn new(pronunciations: PronunciationTable) -> Self {
        Self { pronunciations }
    }

    /// Full normalization of joined chunk words.
    pub fn normalize(&self, joined: &str) -> NormalizedText {
        let cleaned = clean(joined);
        let spoken = if self.pronunciations.is_empty() {
            cleaned.clone()
        } else {
            self.pronunciations.apply(&cleaned)
        };
        NormalizedText { cleaned, spoken }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::pronunciation::PronunciationEntry;
    use proptest::prelude::*;

    #[test]
    fn test_clean_curly_apostrophes() {
        assert_eq!(clean("It\u{2019}s \u{2018}fine"), "It's 'fine");
    }

    #[test]
    fn test_clean_hyphens() {
        assert_eq!(clean("well-known"), "well known");
        assert_eq!(clean("well - known"), "well known");
        assert_eq!(clean("well--known"), "well known");
    }

    #[test]
    fn test_clean_whitespace() {
        assert_eq!(clean("  Hello \t  world \n "), "Hello world");
    }

    #[test]
    fn test_clean_reattaches_contractions() {
        assert_eq!(clean("It 's Harry 's wand"), "It's Harry's wand");
        assert_eq!(clean("I do n't know"), "I don't know");
        assert_eq!(clean("they ’ re here"), "they ' re here");
        assert_eq!(clean("they ’re here"), "they're here");
    }

    #[test]
    fn test_clean_punctuation_spacing() {
        assert_eq!(clean("Hello there ."), "Hello there.");
        assert_eq!(clean("Wait , what ? No ; yes : maybe !"), "Wait, what? No; yes: maybe!");
    }

    #[test]
    fn test_clean_whitespace_only() {
        assert_eq!(clean("   \t "), "");
        assert_eq!(clean(" - "), "");
    }

    #[test]
    fn test_normalize_applies_pronunciations_last() {
        let table = PronunciationTable::new(vec![PronunciationEntry::new(
            "Hermione",
            "Her my oh nee",
        )])
        .unwrap();
        let normalizer = Normalizer::new(table);
        let text = normalizer.normalize("Hermione 's book .");
        assert_eq!(text.cleaned, "Hermione's book.");
        assert_eq!(text.spoken, "Her my oh nee's book.");
    }

    #[test]
    fn test_normalize_without_table_speaks_cleaned_text() {
        let text = Normalizer::default().normalize("I do n't know .");
        assert_eq!(text.cleaned, "I don't know.");
        assert_eq!(text.spoken, text.cleaned);
    }

    #[test]
    fn test_normalize_is_idempotent_with_stable_table() {
        let table = PronunciationTable::new(vec![
            PronunciationEntry::new("Hermione", "Her my oh nee"),
            PronunciationEntry::new("Voldemort", "Vol de mor"),
        ])
        .unwrap();
        let normalizer = Normalizer::new(table);
        let once = normalizer.normalize("Hermione  met Voldemort - was n't it ?").spoken;
        assert_eq!(normalizer.normalize(&once).spoken, once);
    }

    fn stable_normalizer() -> Normalizer {
        let table = PronunciationTable::new(vec![
            PronunciationEntry::new("Hermione", "Her my oh nee"),
            PronunciationEntry::new("Voldemort", "Vol de mor"),
            PronunciationEntry::new("Foo", "F oo"),
        ])
        .unwrap();
        assert_eq!(table.unstable_entries().count(), 0);
        Normalizer::new(table)
    }

    const WORDS: &[&str] = &[
        "Hermione", "Voldemort", "Foo", "the", "do", "'s", "n't", "'re", ".", ",", "?", "!",
        ";", "-", "\u{2019}s", "\u{2018}", "well-known", "a",
    ];

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(s in "[a-zA-Z'\u{2018}\u{2019}\\-\\.,!?;: \t\n]{0,60}") {
            let once = clean(&s);
            prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn prop_clean_never_leaves_double_spaces(s in "\\PC{0,60}") {
            let cleaned = clean(&s);
            prop_assert!(!cleaned.contains("  "));
            prop_assert_eq!(cleaned.trim(), cleaned.as_str());
        }

        #[test]
        fn prop_normalize_is_idempotent_with_stable_table(
            picks in proptest::collection::vec(0..WORDS.len(), 0..24)
        ) {
            let normalizer = stable_normalizer();
            let joined = picks.iter().map(|&i| WORDS[i]).collect::<Vec<_>>().join(" ");
            let once = normalizer.normalize(&joined).spoken;
            prop_assert_eq!(normalizer.normalize(&once).spoken, once);
        }
    }
}
