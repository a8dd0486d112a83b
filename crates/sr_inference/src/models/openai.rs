use std::sync::Arc;
use std::fmt;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sr_core::{Error, HookType, Result, TextGenerator};
use tracing::debug;

use crate::prompts::{repair_prompt, REPAIR_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT};
use crate::rules::HookRules;
use crate::Config;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct BulletsPayload {
    #[serde(default)]
    bullets: Vec<String>,
}

/// Chat-completions client for OpenAI or any API speaking the same protocol.
pub struct OpenAiModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
    rules: HookRules,
}

impl OpenAiModel {
    pub fn new(api_key: String, config: &Config, rules: HookRules) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Inference("OpenAI API key is required".to_string()));
        }
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model_name.clone(),
            rules,
        })
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String> {
        let response = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("{} returned {}: {}", self.model, status, body)));
        }

        let response = response.json::<ChatResponse>().await?;
        let content = response.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Inference("response contained no choices".to_string()))?;
        debug!("🧾 {} responded: {}", self.model, content);
        Ok(content)
    }
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Parse a `{"bullets": [...]}` payload.
pub(crate) fn parse_bullets(content: &str) -> Result<Vec<String>> {
    let payload: BulletsPayload = serde_json::from_str(content.trim())?;
    Ok(payload.bullets)
}

/// Strip whitespace and surrounding double quotes from a rewritten hook.
pub(crate) fn clean_repair(content: &str) -> String {
    content.trim().trim_matches('"').to_string()
}

#[async_trait]
impl TextGenerator for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Vec<String>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SUMMARY_SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: 0.5,
            top_p: Some(0.9),
            max_tokens: 250,
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let content = self.complete(&request).await?;
        parse_bullets(&content)
    }

    async fn repair(&self, text: &str, hook_type: HookType) -> Result<String> {
        let prompt = repair_prompt(text, hook_type, &self.rules);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: REPAIR_SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: 0.4,
            top_p: None,
            max_tokens: 40,
            response_format: None,
        };
        let content = self.complete(&request).await?;
        Ok(clean_repair(&content))
    }
}
