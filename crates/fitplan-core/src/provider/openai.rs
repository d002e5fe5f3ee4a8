//! OpenAI chat-completions adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use fitplan_db::models::PlanContent;

use super::prompt::{self, MAX_OUTPUT_TOKENS, SYSTEM_PROMPT, TEMPERATURE};
use super::{GenerationFailure, PlanProvider, check_status};
use crate::profile::UserProfile;

/// Asks `gpt-3.5-turbo` for the whole plan in one request.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub const NAME: &'static str = "openai";
    pub const API_KEY_ENV: &'static str = "OPENAI_API_KEY";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";
    pub const DEFAULT_MODEL: &'static str = "gpt-3.5-turbo";

    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
        }
    }

    /// Read the key from `OPENAI_API_KEY`.
    pub fn from_env(client: reqwest::Client) -> Result<Self, GenerationFailure> {
        let key = std::env::var(Self::API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GenerationFailure::MissingCredentials(Self::API_KEY_ENV))?;
        Ok(Self::new(client, key))
    }

    /// Point at a different host (tests, proxies). No trailing slash.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }
}

#[async_trait]
impl PlanProvider for OpenAiProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn generate(&self, profile: &UserProfile) -> Result<PlanContent, GenerationFailure> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt::full_plan_prompt(profile)},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_OUTPUT_TOKENS,
        });

        debug!(model = %self.model, "requesting plan from OpenAI");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationFailure::Parse(format!("malformed completion: {e}")))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationFailure::Parse("completion has no content".to_owned()))?;

        prompt::parse_response(&content)
    }
}
