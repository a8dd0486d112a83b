//! Generate, validate, repair and fall back for a single article's hook.
//!
//! The loop makes at most `1 + max_repairs` generator calls and always ends
//! with either an accepted hook or the category's fallback literal.

use std::future::Future;
use std::time::Duration;
use sr_core::{Article, Error, HookType, Result, TextGenerator};
use tracing::{debug, info, warn};

use crate::prompts::summary_prompt;
use crate::rules::HookRules;
use crate::validation::HookValidator;
use crate::window::RecentHooks;

const FAILED_TITLE_CHARS: usize = 90;
const FAILED_DESCRIPTION_CHARS: usize = 110;
const BULLET_MARKERS: &[char] = &[' ', '-', '\u{2022}'];

/// Where the hook loop currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookState {
    Generated,
    Repair(usize),
    Validated,
    Fallback,
}

/// How the final hook was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Passed validation after this many repairs
    Accepted { repairs: usize },
    /// Still rejected after every repair; the category literal was used
    Fallback,
    /// No usable bullets came back; bullets were synthesised from the article
    GenerationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub bullets: [String; 3],
    pub resolution: Resolution,
    pub generator_calls: usize,
}

impl HookOutcome {
    pub fn hook(&self) -> &str {
        &self.bullets[2]
    }
}

/// Trim surrounding spaces, dashes and bullet glyphs.
pub fn strip_bullet_marker(bullet: &str) -> &str {
    bullet.trim_matches(BULLET_MARKERS)
}

/// Collapse internal whitespace and drop one trailing period.
pub fn normalize_hook(hook: &str) -> String {
    let collapsed = hook.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => collapsed,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub struct HookRepairLoop<'a> {
    generator: &'a dyn TextGenerator,
    rules: &'a HookRules,
    call_timeout: Option<Duration>,
}

impl<'a> HookRepairLoop<'a> {
    pub fn new(generator: &'a dyn TextGenerator, rules: &'a HookRules) -> Self {
        Self {
            generator,
            rules,
            call_timeout: None,
        }
    }

    /// Bound every generator call; a timeout counts as a failed call.
    pub fn with_call_timeout(mut self, limit: Option<Duration>) -> Self {
        self.call_timeout = limit;
        self
    }

    async fn call<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => request.await,
        }
    }

    fn failed_bullets(&self, article: &Article) -> [String; 3] {
        [
            truncate_chars(&article.title, FAILED_TITLE_CHARS),
            truncate_chars(&article.description, FAILED_DESCRIPTION_CHARS),
            self.rules.failure_hook.clone(),
        ]
    }

    async fn generate(&self, article: &Article, hook_type: HookType) -> Option<[String; 3]> {
        let prompt = summary_prompt(article, hook_type, self.rules);
        match self.call(self.generator.generate(&prompt)).await {
            Ok(bullets) if bullets.len() >= 3 => {
                let mut bullets = bullets.into_iter().map(|b| strip_bullet_marker(&b).to_string());
                let first = bullets.next().unwrap_or_default();
                let second = bullets.next().unwrap_or_default();
                let hook = normalize_hook(&bullets.next().unwrap_or_default());
                Some([first, second, hook])
            }
            Ok(bullets) => {
                warn!("⚠️ Generator returned {} bullets for '{}', using fallback bullets", bullets.len(), article.title);
                None
            }
            Err(e) => {
                warn!("⚠️ Generation failed for '{}': {}", article.title, e);
                None
            }
        }
    }

    /// Produce the three bullets for `article`. Never fails.
    ///
    /// `recent` holds hooks committed earlier in the run; it is only read.
    pub async fn run(&self, article: &Article, hook_type: HookType, recent: &RecentHooks) -> HookOutcome {
        let Some(mut bullets) = self.generate(article, hook_type).await else {
            return HookOutcome {
                bullets: self.failed_bullets(article),
                resolution: Resolution::GenerationFailed,
                generator_calls: 1,
            };
        };

        let validator = HookValidator::new(self.rules);
        let mut calls = 1;
        let mut state = HookState::Generated;
        let resolution = loop {
            state = match state {
                HookState::Generated | HookState::Repair(_) => {
                    let hook = bullets[2].clone();
                    match validator.check(&hook, recent) {
                        None => HookState::Validated,
                        Some(rejection) => {
                            let attempt = match state {
                                HookState::Repair(done) => done + 1,
                                _ => 1,
                            };
                            if attempt > self.rules.max_repairs {
                                debug!("Hook {:?} still rejected: {}", hook, rejection);
                                HookState::Fallback
                            } else {
                                info!("🔧 Hook {:?} {}; repair {}/{}", hook, rejection, attempt, self.rules.max_repairs);
                                calls += 1;
                                let repaired = self.call(self.generator.repair(&hook, hook_type)).await;
                                match repaired {
                                    Ok(text) => bullets[2] = normalize_hook(&text),
                                    Err(e) => warn!("⚠️ Repair {} failed for '{}': {}", attempt, article.title, e),
                                }
                                HookState::Repair(attempt)
                            }
                        }
                    }
                }
                HookState::Validated => {
                    break Resolution::Accepted {
                        repairs: calls - 1,
                    };
                }
                HookState::Fallback => {
                    bullets[2] = self.rules.fallback_for(hook_type).to_string();
                    info!("🪂 Using {} fallback hook for '{}'", hook_type, article.title);
                    break Resolution::Fallback;
                }
            };
        };

        HookOutcome {
            bullets,
            resolution,
            generator_calls: calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use async_trait::async_trait;

    fn article() -> Article {
        Article {
            title: "Council approves a longer budget title that keeps going well past ninety characters in total length".to_string(),
            link: "https://example.com/budget".to_string(),
            published_at: "2024-09-10T10:00:00+00:00".to_string(),
            description: "d".repeat(300),
        }
    }

    #[test]
    fn test_normalize_hook() {
        assert_eq!(normalize_hook("  Vote  set\tfor Sept. 18. "), "Vote set for Sept. 18");
        assert_eq!(normalize_hook("Two periods.."), "Two periods.");
        assert_eq!(normalize_hook(""), "");
    }

    #[test]
    fn test_strip_bullet_marker() {
        assert_eq!(strip_bullet_marker("• Council met"), "Council met");
        assert_eq!(strip_bullet_marker("- Vote was 9-4 "), "Vote was 9-4");
        assert_eq!(strip_bullet_marker("\u{2022}- Fares rise"), "Fares rise");
    }

    #[tokio::test]
    async fn test_accepted_without_repair() {
        let model = DummyModel::new().with_bullets([
            "• Council met Monday",
            "- Vote was 9-4",
            "•  Ridership   climbed to 41,000 in June. ",
        ]);
        let rules = HookRules::default();
        let outcome = HookRepairLoop::new(&model, &rules)
            .run(&article(), HookType::StatPoint, &RecentHooks::new(10))
            .await;

        assert_eq!(outcome.resolution, Resolution::Accepted { repairs: 0 });
        assert_eq!(outcome.bullets[0], "Council met Monday");
        assert_eq!(outcome.bullets[1], "Vote was 9-4");
        assert_eq!(outcome.hook(), "Ridership climbed to 41,000 in June");
        assert_eq!(outcome.generator_calls, 1);
        assert_eq!(model.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_repaired_on_first_retry() {
        let model = DummyModel::new()
            .with_bullets(["a", "b", "Will Mayor Wu sign the 2025 budget?"])
            .with_repair("Mayor Wu signs 2025 budget Friday.");
        let rules = HookRules::default();
        let outcome = HookRepairLoop::new(&model, &rules)
            .run(&article(), HookType::WhatChanged, &RecentHooks::new(10))
            .await;

        assert_eq!(outcome.resolution, Resolution::Accepted { repairs: 1 });
        assert_eq!(outcome.hook(), "Mayor Wu signs 2025 budget Friday");
        assert_eq!(model.repair_calls(), 1);
    }

    #[tokio::test]
    async fn test_always_rejected_falls_back_after_two_repairs() {
        let model = DummyModel::new()
            .with_bullets(["a", "b", "the team will review plans"])
            .with_repair("the board will review plans")
            .with_repair("the panel will review plans")
            .with_repair("never requested");
        let rules = HookRules::default();
        let outcome = HookRepairLoop::new(&model, &rules)
            .run(&article(), HookType::Comparison, &RecentHooks::new(10))
            .await;

        assert_eq!(outcome.resolution, Resolution::Fallback);
        assert_eq!(outcome.hook(), rules.fallback_for(HookType::Comparison));
        assert_eq!(outcome.generator_calls, 3);
        assert_eq!(model.repair_calls(), 2);
        assert_eq!(model.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_repair_errors_count_as_rejections() {
        let model = DummyModel::new()
            .with_bullets(["a", "b", "What did Boston decide?"])
            .with_repair_error("rate limited")
            .with_repair_error("rate limited");
        let rules = HookRules::default();
        let outcome = HookRepairLoop::new(&model, &rules)
            .run(&article(), HookType::Timeline, &RecentHooks::new(10))
            .await;

        assert_eq!(outcome.resolution, Resolution::Fallback);
        assert_eq!(outcome.hook(), "Formal vote scheduled Sept. 18");
        assert_eq!(model.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_similarity_uses_recent_hooks() {
        let hook = "Ridership climbed to 41,000 in June";
        let model = DummyModel::new()
            .with_bullets(["a", "b", hook])
            .with_repair(hook)
            .with_repair(hook);
        let rules = HookRules::default();
        let recent: RecentHooks = [hook].into_iter().collect();
        let outcome = HookRepairLoop::new(&model, &rules)
            .run(&article(), HookType::OddDetail, &recent)
            .await;

        assert_eq!(outcome.resolution, Resolution::Fallback);
        assert_eq!(outcome.hook(), rules.fallback_for(HookType::OddDetail));
    }

    #[tokio::test]
    async fn test_generation_failure_synthesises_bullets() {
        let model = DummyModel::new().with_generation_error("503");
        let rules = HookRules::default();
        let article = article();
        let outcome = HookRepairLoop::new(&model, &rules)
            .run(&article, HookType::QuoteShard, &RecentHooks::new(10))
            .await;

        assert_eq!(outcome.resolution, Resolution::GenerationFailed);
        assert_eq!(outcome.bullets[0].chars().count(), 90);
        assert!(article.title.starts_with(&outcome.bullets[0]));
        assert_eq!(outcome.bullets[1], "d".repeat(110));
        assert_eq!(outcome.hook(), rules.failure_hook);
        assert_eq!(model.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_short_generation_is_a_failure() {
        // The failure hook is accepted even when it repeats a recent hook
        let rules = HookRules::default();
        let recent: RecentHooks = [rules.failure_hook.clone()].into_iter().collect();
        let model = DummyModel::new().with_bullets(["only", "two"]);
        let outcome = HookRepairLoop::new(&model, &rules)
            .run(&article(), HookType::StatPoint, &recent)
            .await;

        assert_eq!(outcome.resolution, Resolution::GenerationFailed);
        assert_eq!(outcome.hook(), rules.failure_hook);
        assert_eq!(model.repair_calls(), 0);
    }

    #[derive(Debug)]
    struct StalledModel;

    #[async_trait]
    impl TextGenerator for StalledModel {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn generate(&self, _prompt: &str) -> Result<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![])
        }

        async fn repair(&self, _text: &str, _hook_type: HookType) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_timeout_is_a_generation_failure() {
        let rules = HookRules::default();
        let outcome = HookRepairLoop::new(&StalledModel, &rules)
            .with_call_timeout(Some(Duration::from_millis(20)))
            .run(&article(), HookType::LocalImpact, &RecentHooks::new(10))
            .await;

        assert_eq!(outcome.resolution, Resolution::GenerationFailed);
        assert_eq!(outcome.generator_calls, 1);
    }
}
