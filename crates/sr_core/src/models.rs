use async_trait::async_trait;
use std::fmt;
use crate::types::HookType;
use crate::Result;

#[async_trait]
pub trait TextGenerator: Send + Sync + fmt::Debug {
    /// Identifier reported in digest stats
    fn name(&self) -> &str;

    /// Run a full summary prompt and return the bullets it produced.
    /// May return fewer than three; callers decide what that means.
    async fn generate(&self, prompt: &str) -> Result<Vec<String>>;

    /// Rewrite `text` into a single hook of the given category.
    async fn repair(&self, text: &str, hook_type: HookType) -> Result<String>;
}
