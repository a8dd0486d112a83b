use anyhow::Context;
use clap::Parser;
use sr_feeds::RssFeedSource;
use sr_inference::validation::HookValidator;
use sr_inference::{create_model, Config, DigestBuilder, HookRules, RecentHooks};
use sr_storage::DEFAULT_HISTORY_CAP;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod logging;
mod pipeline;

use pipeline::Pipeline;

const DEFAULT_FEED_URL: &str = "https://www.boston.com/feed/bdc-ms";

/// Interval such as `90`, `45s`, `30m`, `1h15m` or `1d`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total = 0u64;
        let mut digits = String::new();

        for c in s.trim().chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3_600,
                'd' => 86_400,
                other => return Err(format!("Invalid duration unit: {}", other)),
            };
            let amount: u64 = digits
                .parse()
                .map_err(|_| format!("Unit '{}' is missing a number", c))?;
            total = amount
                .checked_mul(unit)
                .and_then(|seconds| total.checked_add(seconds))
                .ok_or_else(|| format!("Duration {} is too long", s))?;
            digits.clear();
        }

        // trailing bare number means seconds
        if !digits.is_empty() {
            let seconds = digits.parse::<u64>().map_err(|e| e.to_string())?;
            total = total
                .checked_add(seconds)
                .ok_or_else(|| format!("Duration {} is too long", s))?;
        }

        if total == 0 {
            return Err("Duration must be greater than zero".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Three-bullet speed read of a news feed", long_about = None)]
struct Cli {
    #[arg(long, env = "FEED_URL", default_value = DEFAULT_FEED_URL)]
    feed_url: String,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "OPENAI_MODEL", default_value = sr_inference::DEFAULT_MODEL)]
    model: String,
    #[arg(long, env = "OPENAI_BASE_URL", default_value = sr_inference::DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, env = "MAX_ITEMS", default_value_t = 12)]
    max_items: usize,
    #[arg(long, default_value = "news-data.json")]
    output: PathBuf,
    #[arg(long, default_value = "news-history.json")]
    history: PathBuf,
    #[arg(long, default_value = "json", help = "History backend: json (default), memory")]
    storage: String,
    #[arg(long, default_value_t = DEFAULT_HISTORY_CAP)]
    history_cap: usize,
    /// Pause between articles, in milliseconds
    #[arg(long, default_value_t = 600)]
    delay_ms: u64,
    /// Limit for each generator call, in seconds (0 disables it)
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
    /// JSON file overriding banned phrases, limits or fallback hooks
    #[arg(long)]
    rules: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch the feed, build the digest and update the history archive
    Run {
        /// Repeat forever with this interval (e.g. 1h, 30m, 1h15m)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Check a hook against the acceptance rules
    Validate {
        hook: String,
        /// Previously accepted hooks to compare against
        #[arg(long = "recent")]
        recent: Vec<String>,
    },
}

fn load_rules(path: Option<&PathBuf>) -> anyhow::Result<HookRules> {
    match path {
        Some(path) => HookRules::from_file(path)
            .with_context(|| format!("Failed to load rules from {}", path.display())),
        None => Ok(HookRules::default()),
    }
}

fn build_pipeline(cli: &Cli, rules: HookRules) -> anyhow::Result<Pipeline> {
    let config = Config {
        api_key: cli.api_key.clone(),
        model_name: cli.model.clone(),
        base_url: cli.base_url.clone(),
    };
    let generator = create_model(&config, &rules);
    let call_timeout = (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs));
    let builder = DigestBuilder::new(generator, rules)
        .with_feed(cli.feed_url.clone())
        .with_delay(Duration::from_millis(cli.delay_ms))
        .with_call_timeout(call_timeout);
    let history = sr_storage::create_storage(&cli.storage, cli.history.clone(), cli.history_cap)?;
    info!("🏦 History backend initialized (using {})", cli.storage);

    Ok(Pipeline {
        feed: Arc::new(RssFeedSource::new()),
        feed_url: cli.feed_url.clone(),
        max_items: cli.max_items,
        builder,
        history,
        output: cli.output.clone(),
    })
}

fn validate(hook: &str, recent: &[String], rules: &HookRules) {
    let window: RecentHooks = recent.iter().cloned().collect();
    match HookValidator::new(rules).check(hook, &window) {
        None => println!("✅ accepted: {}", hook),
        Some(rejection) => println!("❌ rejected: {} {}", hook, rejection),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let rules = load_rules(cli.rules.as_ref())?;

    match cli.command.as_ref().unwrap_or(&Commands::Run { interval: None }) {
        Commands::Validate { hook, recent } => validate(hook, recent, &rules),
        Commands::Run { interval } => {
            let pipeline = build_pipeline(&cli, rules)?;
            match interval {
                Some(interval) => {
                    info!("⏱️ Running every {}s", interval.0.as_secs());
                    loop {
                        pipeline.run().await;
                        info!("💤 Waiting {}s before next run", interval.0.as_secs());
                        tokio::time::sleep(interval.0).await;
                    }
                }
                None => {
                    pipeline.run().await;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration() {
        assert_eq!("90".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert_eq!("45s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(45));
        assert_eq!("1h15m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(4530));
        assert_eq!("1d 2h".parse::<HumanDuration>().unwrap().0, Duration::from_secs(93_600));
        assert!("".parse::<HumanDuration>().is_err());
        assert!("0m".parse::<HumanDuration>().is_err());
        assert!("5w".parse::<HumanDuration>().is_err());
        assert!("h".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_human_duration_overflow_is_an_error() {
        assert!("99999999999999999d".parse::<HumanDuration>().is_err());
        assert!("18446744073709551615s1s".parse::<HumanDuration>().is_err());
        assert!("18446744073709551615d".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999999".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["sr", "--api-key", "sk-test"]).unwrap();
        assert_eq!(cli.max_items, 12);
        assert_eq!(cli.history_cap, 2000);
        assert_eq!(cli.output, PathBuf::from("news-data.json"));
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["sr", "run", "--interval", "30m"]).unwrap();
        match cli.command {
            Some(Commands::Run { interval: Some(interval) }) => {
                assert_eq!(interval.0, Duration::from_secs(1800))
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::try_parse_from(["sr", "validate", "Vote set for Sept. 18", "--recent", "a", "--recent", "b"]).unwrap();
        match cli.command {
            Some(Commands::Validate { hook, recent }) => {
                assert_eq!(hook, "Vote set for Sept. 18");
                assert_eq!(recent, vec!["a", "b"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_build_pipeline_without_key() {
        let cli = Cli::try_parse_from(["sr", "--storage", "memory", "--timeout-secs", "0"]).unwrap();
        let pipeline = build_pipeline(&Cli { api_key: None, ..cli }, HookRules::default()).unwrap();
        assert_eq!(pipeline.max_items, 12);

        let cli = Cli::try_parse_from(["sr", "--storage", "sqlite"]).unwrap();
        assert!(build_pipeline(&cli, HookRules::default()).is_err());
    }
}
