//! Google Gemini `generateContent` adapter.
//!
//! Gemini is asked for the workout and diet halves in two separate
//! requests; both must succeed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use fitplan_db::models::{DietPlan, PlanContent, WorkoutPlan};

use super::prompt::{self, MAX_OUTPUT_TOKENS, TEMPERATURE};
use super::{GenerationFailure, PlanProvider, check_status};
use crate::profile::UserProfile;

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub const NAME: &'static str = "gemini";
    pub const API_KEY_ENV: &'static str = "GEMINI_API_KEY";
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";

    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
        }
    }

    /// Read the key from `GEMINI_API_KEY`.
    pub fn from_env(client: reqwest::Client) -> Result<Self, GenerationFailure> {
        let key = std::env::var(Self::API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GenerationFailure::MissingCredentials(Self::API_KEY_ENV))?;
        Ok(Self::new(client, key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Send one prompt and return the concatenated text of the first
    /// candidate.
    async fn complete(&self, prompt_text: String) -> Result<String, GenerationFailure> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt_text}]}],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            },
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationFailure::Parse(format!("malformed Gemini response: {e}")))?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationFailure::Parse("Gemini returned no candidates".to_owned()))?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        Ok(text)
    }
}

#[async_trait]
impl PlanProvider for GeminiProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn generate(&self, profile: &UserProfile) -> Result<PlanContent, GenerationFailure> {
        debug!(model = %self.model, "requesting workout plan from Gemini");
        let workout_text = self.complete(prompt::workout_prompt(profile)).await?;
        let workout_plan: WorkoutPlan = prompt::parse_response(&workout_text)?;

        debug!(model = %self.model, "requesting diet plan from Gemini");
        let diet_text = self.complete(prompt::diet_prompt(profile)).await?;
        let diet_plan: DietPlan = prompt::parse_response(&diet_text)?;

        Ok(PlanContent {
            workout_plan,
            diet_plan,
        })
    }
}
