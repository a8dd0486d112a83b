//! Acceptance rules for curiosity hooks.
//!
//! Everything here is a pure function of the candidate text, the configured
//! [`HookRules`] and, for the similarity check, the hooks already committed in
//! the current run.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::rules::HookRules;
use crate::window::RecentHooks;

lazy_static! {
    static ref HAS_DIGIT: Regex = Regex::new(r"\d").unwrap();
    // Two consecutive capitalised words, or an all-caps token of 2+ letters
    static ref HAS_PROPER_NOUN: Regex =
        Regex::new(r"\b([A-Z][a-z]+\s+[A-Z][a-z]+|[A-Z]{2,})\b").unwrap();
}

const QUOTE_MARKS: [char; 3] = ['"', '\u{201C}', '\u{201D}'];

/// Why a hook was turned down.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("contains a question mark")]
    Question,
    #[error("has {words} words (max {max})")]
    TooLong { words: usize, max: usize },
    #[error("contains banned phrase {0:?}")]
    BannedPhrase(String),
    #[error("has no number, proper noun or quote")]
    NotConcrete,
    #[error("is {ratio:.2} similar to recent hook {previous:?}")]
    TooSimilar { ratio: f64, previous: String },
}

/// Normalised similarity in `[0, 1]`: 1.0 for identical strings, 0.0 when the
/// strings share no characters. Symmetric.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// True if `s` has a digit, a proper-noun-shaped token or a quotation mark.
pub fn is_concrete(s: &str) -> bool {
    HAS_DIGIT.is_match(s) || HAS_PROPER_NOUN.is_match(s) || s.contains(QUOTE_MARKS)
}

#[derive(Debug, Clone, Copy)]
pub struct HookValidator<'a> {
    rules: &'a HookRules,
}

impl<'a> HookValidator<'a> {
    pub fn new(rules: &'a HookRules) -> Self {
        Self { rules }
    }

    fn constraint_violation(&self, s: &str) -> Option<Rejection> {
        if s.contains('?') {
            return Some(Rejection::Question);
        }
        let words = s.split_whitespace().count();
        if words > self.rules.max_words {
            return Some(Rejection::TooLong {
                words,
                max: self.rules.max_words,
            });
        }
        let lowered = s.to_lowercase();
        self.rules
            .banned_phrases
            .iter()
            .find(|phrase| lowered.contains(phrase.as_str()))
            .map(|phrase| Rejection::BannedPhrase(phrase.clone()))
    }

    /// Question mark, too many words, or a banned phrase anywhere in the text.
    pub fn violates_constraints(&self, s: &str) -> bool {
        self.constraint_violation(s).is_some()
    }

    pub fn is_concrete(&self, s: &str) -> bool {
        is_concrete(s)
    }

    fn first_similar<'w>(&self, s: &str, window: &'w RecentHooks) -> Option<(f64, &'w str)> {
        window
            .iter()
            .map(|previous| (similarity(s, previous), previous))
            .find(|(ratio, _)| *ratio > self.rules.similarity_threshold)
    }

    /// True if any hook in `window` is more similar than the threshold.
    pub fn is_too_similar(&self, s: &str, window: &RecentHooks) -> bool {
        self.first_similar(s, window).is_some()
    }

    /// First reason `s` is rejected, or `None` if it is acceptable.
    pub fn check(&self, s: &str, window: &RecentHooks) -> Option<Rejection> {
        if let Some(rejection) = self.constraint_violation(s) {
            return Some(rejection);
        }
        if !is_concrete(s) {
            return Some(Rejection::NotConcrete);
        }
        self.first_similar(s, window)
            .map(|(ratio, previous)| Rejection::TooSimilar {
                ratio,
                previous: previous.to_string(),
            })
    }

    pub fn accepts(&self, s: &str, window: &RecentHooks) -> bool {
        self.check(s, window).is_none()
    }
}
