use std::fmt;

pub mod digest;
pub mod models;
pub mod prompts;
pub mod repair;
pub mod rules;
pub mod validation;
pub mod window;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_name: String,
    pub base_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub mod prelude {
    pub use super::Config;
    pub use super::digest::DigestBuilder;
    pub use super::models::create_model;
    pub use super::rules::HookRules;
    pub use super::validation::{HookValidator, Rejection};
    pub use super::window::RecentHooks;
    pub use sr_core::{Article, Digest, Error, HookType, Result, SummaryRecord};
}

pub use digest::DigestBuilder;
pub use models::create_model;
pub use repair::{HookOutcome, HookRepairLoop, Resolution};
pub use rules::HookRules;
pub use validation::{HookValidator, Rejection};
pub use window::RecentHooks;
