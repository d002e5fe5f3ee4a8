//! AI plan providers.
//!
//! A [`PlanProvider`] turns a [`UserProfile`](crate::profile::UserProfile)
//! into plan content by prompting a hosted language model. Providers are
//! collected in a [`ProviderRegistry`] and selected by name.
//!
//! ```text
//! PlanGenerator
//!     |
//!     v
//! ProviderRegistry --get("openai")--> Arc<dyn PlanProvider>
//!                                          |
//!                          generate(profile) -> PlanContent | GenerationFailure
//! ```

pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod registry;
pub mod trait_def;

use std::time::Duration;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use registry::ProviderRegistry;
pub use trait_def::PlanProvider;

/// Request timeout applied to every provider call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Why a provider could not produce a plan. Callers treat every variant the
/// same way: fall back to the catalog planner.
#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    #[error("missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unusable provider response: {0}")]
    Parse(String),
}

/// Build the HTTP client shared by all providers.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()
}

/// Turn a non-success response into [`GenerationFailure::Status`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GenerationFailure::Status {
        status: status.as_u16(),
        body,
    })
}
