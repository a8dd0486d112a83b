use sr_core::{Article, HookType};

use crate::rules::HookRules;

pub const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a precise news summarizer. Output strict JSON only.";
pub const REPAIR_SYSTEM_PROMPT: &str = "You rewrite text tersely and concretely.";

/// Characters of article text embedded in the summary prompt
const MAX_PROMPT_TEXT: usize = 1200;

/// Prompt asking for three bullets: a neutral restatement, one concrete
/// detail, and a hook of `hook_type`.
pub fn summary_prompt(article: &Article, hook_type: HookType, rules: &HookRules) -> String {
    let text: String = article.description.chars().take(MAX_PROMPT_TEXT).collect();
    format!(
        r#"Return JSON ONLY: {{"bullets": ["...","...","..."]}}
Write three concise bullets for a news speed-read.
Rules:
- #1: what happened (plain, neutral)
- #2: one key detail (use a number/name/decision)
- #3: curiosity hook of type {hook_type}:
  • ≤{max_words} words. No hype, no questions, no second person.
  • Must include a number OR proper noun OR short quote fragment.
  • Avoid: {banned}.
Vary syntax across items.
Title: {title}
Text: {text}"#,
        hook_type = hook_type,
        max_words = rules.max_words,
        banned = rules.banned_list(),
        title = article.title,
        text = text,
    )
    .trim()
    .to_string()
}

/// Narrow rewrite request used when a hook is rejected.
pub fn repair_prompt(hook: &str, hook_type: HookType, rules: &HookRules) -> String {
    format!(
        "Rewrite this into a single {hook_type} hook.
• ≤{max_words} words; factual, concrete. No hype, no questions, no second person.
• Include a number OR proper noun OR short quote fragment.
Avoid: {banned}.
Text: {hook}
Return only the rewritten hook.",
        hook_type = hook_type,
        max_words = rules.max_words,
        banned = rules.banned_list(),
        hook = hook,
    )
}
