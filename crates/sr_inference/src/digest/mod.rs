use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use sr_core::{Article, Digest, HookType, SummaryRecord, TextGenerator, NO_API_KEY};
use tracing::{info, warn};

use crate::repair::{HookRepairLoop, Resolution};
use crate::rules::HookRules;
use crate::window::RecentHooks;

/// Pause between articles, to stay under the generator's rate limits.
pub const DEFAULT_ARTICLE_DELAY: Duration = Duration::from_millis(600);

/// Turns a feed's articles into digest records, one article at a time.
///
/// Hooks are checked for similarity only against hooks committed earlier in
/// the same run, so articles are processed strictly in feed order.
pub struct DigestBuilder {
    generator: Option<Arc<dyn TextGenerator>>,
    rules: HookRules,
    feed: String,
    delay: Duration,
    call_timeout: Option<Duration>,
}

impl fmt::Debug for DigestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestBuilder")
            .field("generator", &self.generator.as_ref().map(|g| g.name()))
            .field("feed", &self.feed)
            .field("delay", &self.delay)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Tally {
    accepted: usize,
    repaired: usize,
    fallback: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Accepted { repairs: 0 } => self.accepted += 1,
            Resolution::Accepted { .. } => self.repaired += 1,
            Resolution::Fallback => self.fallback += 1,
            Resolution::GenerationFailed => self.failed += 1,
        }
    }
}

impl DigestBuilder {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, rules: HookRules) -> Self {
        Self {
            generator,
            rules,
            feed: String::new(),
            delay: DEFAULT_ARTICLE_DELAY,
            call_timeout: None,
        }
    }

    /// Source identifier reported in the digest stats
    pub fn with_feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = feed.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_call_timeout(mut self, limit: Option<Duration>) -> Self {
        self.call_timeout = limit;
        self
    }

    /// Build the digest for `articles`.
    ///
    /// Without a generator no calls are made and the digest carries the
    /// `no_api_key` error instead of records.
    pub async fn build(&self, articles: &[Article]) -> Digest {
        let Some(generator) = &self.generator else {
            warn!("🔑 No generator configured, skipping {} articles", articles.len());
            return Digest::failed(NO_API_KEY);
        };

        let mut recent = RecentHooks::new(self.rules.window_size);
        let records = self.summarize(generator.as_ref(), articles, &mut recent).await;
        Digest::completed(records, &self.feed, generator.name())
    }

    /// Summarize every article in order, committing each final hook to
    /// `recent` before moving on to the next article.
    pub async fn summarize(
        &self,
        generator: &dyn TextGenerator,
        articles: &[Article],
        recent: &mut RecentHooks,
    ) -> Vec<SummaryRecord> {
        let repair_loop = HookRepairLoop::new(generator, &self.rules).with_call_timeout(self.call_timeout);
        let mut records = Vec::with_capacity(articles.len());
        let mut tally = Tally::default();

        for (position, article) in articles.iter().enumerate() {
            if position > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let hook_type = HookType::for_position(position);
            info!("📰 [{}/{}] {} ({})", position + 1, articles.len(), article.title, hook_type);

            let outcome = repair_loop.run(article, hook_type, recent).await;
            tally.record(outcome.resolution);
            recent.push(outcome.hook());

            records.push(SummaryRecord {
                title: article.title.clone(),
                link: article.link.clone(),
                published_at: article.published_at.clone(),
                bullets: outcome.bullets,
                hook_type,
            });
        }

        info!(
            "✅ Summarized {} articles: {} accepted, {} repaired, {} fallback, {} failed",
            records.len(),
            tally.accepted,
            tally.repaired,
            tally.fallback,
            tally.failed
        );
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use crate::validation::HookValidator;

    fn article(n: usize) -> Article {
        Article {
            title: format!("Story {}", n),
            link: format!("https://example.com/{}", n),
            published_at: "2024-09-10T10:00:00+00:00".to_string(),
            description: format!("Description of story {}", n),
        }
    }

    fn builder(model: Arc<DummyModel>) -> DigestBuilder {
        DigestBuilder::new(Some(model), HookRules::default())
            .with_feed("https://example.com/feed")
            .with_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_three_article_run() {
        let first_hook = "Ridership climbed to 41,000 in June";
        let model = Arc::new(
            DummyModel::new()
                .with_bullets(["Council met", "Vote was 9-4", first_hook])
                .with_bullets(["Budget passed", "It totals $4B", "Will Mayor Wu sign the 2025 budget?"])
                .with_repair("Mayor Wu signs 2025 budget Friday")
                .with_bullets(["Trains delayed", "Signal fault at 8 a.m.", first_hook])
                .with_repair(first_hook)
                .with_repair(first_hook),
        );
        let articles: Vec<Article> = (1..=3).map(article).collect();

        let digest = builder(model.clone()).build(&articles).await;

        assert_eq!(digest.articles.len(), 3);
        assert!(digest.error().is_none());
        let records = &digest.articles;
        assert_eq!(records[0].hook(), first_hook);
        assert_eq!(records[0].hook_type, HookType::StatPoint);
        assert!(!records[1].hook().contains('?'));
        assert_eq!(records[1].hook(), "Mayor Wu signs 2025 budget Friday");
        assert_eq!(records[2].hook_type, HookType::LocalImpact);
        assert_eq!(records[2].hook(), HookRules::default().fallback_for(HookType::LocalImpact));
        assert_eq!(records[2].bullets[0], "Trains delayed");
        assert_eq!(records[2].link, "https://example.com/3");

        assert_eq!(model.generate_calls(), 3);
        assert_eq!(model.repair_calls(), 3);

        match &digest.stats {
            sr_core::DigestStats::Completed { count, feed, model } => {
                assert_eq!(*count, 3);
                assert_eq!(feed, "https://example.com/feed");
                assert_eq!(model, "dummy");
            }
            other => panic!("unexpected stats {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_every_hook_is_accepted_or_fallback() {
        let model = Arc::new(
            DummyModel::new()
                .with_bullets(["a", "b", "You might be surprised"])
                .with_repair("Fares rise 10 cents on Monday")
                .with_bullets(["a", "b", "Fares rise 10 cents on Monday"])
                .with_repair("the team will review plans")
                .with_repair("Fares rise 10 cents on Monday"),
        );
        let rules = HookRules::default();
        let articles: Vec<Article> = (1..=2).map(article).collect();
        let mut recent = RecentHooks::new(rules.window_size);

        let builder = builder(model.clone());
        let records = builder.summarize(model.as_ref(), &articles, &mut recent).await;

        let validator = HookValidator::new(&rules);
        let mut seen = RecentHooks::new(rules.window_size);
        for record in &records {
            let hook = record.hook();
            assert!(
                validator.accepts(hook, &seen) || hook == rules.fallback_for(record.hook_type),
                "hook {:?} was neither accepted nor the fallback",
                hook
            );
            seen.push(hook);
        }
        assert_eq!(records[1].hook(), rules.fallback_for(HookType::QuoteShard));
    }

    #[tokio::test]
    async fn test_window_is_capped_across_a_long_run() {
        // Every generation fails, so each article commits the failure hook
        let model = Arc::new(DummyModel::new());
        let rules = HookRules::default();
        let articles: Vec<Article> = (1..=15).map(article).collect();
        let mut recent = RecentHooks::new(rules.window_size);

        let records = builder(model.clone()).summarize(model.as_ref(), &articles, &mut recent).await;

        assert_eq!(records.len(), 15);
        assert_eq!(recent.len(), 10);
        assert_eq!(model.total_calls(), 15);
        assert_eq!(records[14].hook_type, HookType::StatPoint);
        assert!(recent.iter().all(|hook| hook == rules.failure_hook));
    }

    #[tokio::test]
    async fn test_missing_generator_short_circuits() {
        let digest = DigestBuilder::new(None, HookRules::default())
            .build(&[article(1), article(2)])
            .await;

        assert!(digest.articles.is_empty());
        assert_eq!(digest.error(), Some(NO_API_KEY));
    }

    #[tokio::test]
    async fn test_empty_feed() {
        let model = Arc::new(DummyModel::new());
        let digest = builder(model.clone()).build(&[]).await;
        assert!(digest.articles.is_empty());
        assert!(digest.error().is_none());
        assert_eq!(model.total_calls(), 0);
    }
}
