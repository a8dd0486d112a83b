//! Tunables for hook validation, repair and fallback.
//!
//! Every field has a default matching the values the digest has always run
//! with, and every field can be overridden from a JSON rules file.

use serde::{Deserialize, Serialize};
use sr_core::{HookType, Result};
use std::path::Path;

pub const DEFAULT_MAX_WORDS: usize = 14;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;
pub const DEFAULT_WINDOW_SIZE: usize = 10;
pub const DEFAULT_MAX_REPAIRS: usize = 2;

const DEFAULT_BANNED_PHRASES: &[&str] = &[
    "why it matters",
    "what happens next",
    "raises questions",
    "sparks debate",
    "the real reason",
    "surprising",
    "shocking",
    "stunning",
    "nobody saw coming",
    "could be set to",
    "what you need to know",
    "what to know",
    "could be",
    "might",
    "reveals",
    "you ",
    "you’ll",
    "you can",
    "you might",
];

const DEFAULT_FAILURE_HOOK: &str = "Orange Line headways widen to 12 minutes Thursday";

/// One pre-authored hook per [`HookType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FallbackHooks {
    pub stat_point: String,
    pub quote_shard: String,
    pub local_impact: String,
    pub what_changed: String,
    pub timeline: String,
    pub comparison: String,
    pub odd_detail: String,
}

impl Default for FallbackHooks {
    fn default() -> Self {
        Self {
            stat_point: "Attendance hit 20,000, team said".to_string(),
            quote_shard: "Coach: \"We’re thin at center\"".to_string(),
            local_impact: DEFAULT_FAILURE_HOOK.to_string(),
            what_changed: "Permit hearings drop the in-person requirement".to_string(),
            timeline: "Formal vote scheduled Sept. 18".to_string(),
            comparison: "Costs run 28% higher than Cambridge’s plan".to_string(),
            odd_detail: "House includes a mushroom-shaped reading nook".to_string(),
        }
    }
}

impl FallbackHooks {
    pub fn get(&self, hook_type: HookType) -> &str {
        match hook_type {
            HookType::StatPoint => &self.stat_point,
            HookType::QuoteShard => &self.quote_shard,
            HookType::LocalImpact => &self.local_impact,
            HookType::WhatChanged => &self.what_changed,
            HookType::Timeline => &self.timeline,
            HookType::Comparison => &self.comparison,
            HookType::OddDetail => &self.odd_detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookRules {
    /// Matched as lowercase substrings, not whole words
    pub banned_phrases: Vec<String>,
    pub max_words: usize,
    pub similarity_threshold: f64,
    pub window_size: usize,
    pub max_repairs: usize,
    pub fallbacks: FallbackHooks,
    /// Hook used when the generator gives no usable bullets at all
    pub failure_hook: String,
}

impl Default for HookRules {
    fn default() -> Self {
        Self {
            banned_phrases: DEFAULT_BANNED_PHRASES.iter().map(|p| p.to_string()).collect(),
            max_words: DEFAULT_MAX_WORDS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            window_size: DEFAULT_WINDOW_SIZE,
            max_repairs: DEFAULT_MAX_REPAIRS,
            fallbacks: FallbackHooks::default(),
            failure_hook: DEFAULT_FAILURE_HOOK.to_string(),
        }
    }
}

impl HookRules {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut rules: HookRules = serde_json::from_str(&raw)?;
        for phrase in rules.banned_phrases.iter_mut() {
            *phrase = phrase.to_lowercase();
        }
        Ok(rules)
    }

    pub fn fallback_for(&self, hook_type: HookType) -> &str {
        self.fallbacks.get(hook_type)
    }

    /// Banned phrases sorted and comma-joined, as embedded in prompts
    pub fn banned_list(&self) -> String {
        let mut phrases: Vec<&str> = self.banned_phrases.iter().map(String::as_str).collect();
        phrases.sort_unstable();
        phrases.join(", ")
    }
}
