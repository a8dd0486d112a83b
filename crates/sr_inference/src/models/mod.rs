use std::sync::Arc;
use sr_core::TextGenerator;
use tracing::{info, warn};

use crate::rules::HookRules;
use crate::Config;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

/// Build the configured generator, or `None` when no credential is available.
pub fn create_model(config: &Config, rules: &HookRules) -> Option<Arc<dyn TextGenerator>> {
    let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
    match OpenAiModel::new(api_key.to_string(), config, rules.clone()) {
        Ok(model) => {
            info!("🧠 Using {} at {}", config.model_name, config.base_url);
            Some(Arc::new(model))
        }
        Err(e) => {
            warn!("⚠️ Could not create generator: {}", e);
            None
        }
    }
}
