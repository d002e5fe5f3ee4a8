//! Plan generation: try the configured AI provider, fall back to the
//! catalog planner on any failure.

use std::fmt;
use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use fitplan_db::models::PlanContent;

use crate::fallback::FallbackPlanGenerator;
use crate::profile::UserProfile;
use crate::provider::{GenerationFailure, PlanProvider};

/// Where a generated plan came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlanSource {
    Ai { provider: String },
    Fallback,
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanSource::Ai { provider } => write!(f, "ai ({provider})"),
            PlanSource::Fallback => f.write_str("fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPlan {
    pub content: PlanContent,
    pub source: PlanSource,
}

/// Generates plans. Never fails: every provider failure degrades to the
/// fallback planner.
pub struct PlanGenerator {
    provider: Option<Arc<dyn PlanProvider>>,
    fallback: FallbackPlanGenerator<'static>,
    rng: Mutex<StdRng>,
}

impl PlanGenerator {
    /// Build a generator around an optional provider. `None` means every
    /// plan comes from the fallback planner.
    pub fn new(provider: Option<Arc<dyn PlanProvider>>) -> Self {
        Self {
            provider,
            fallback: FallbackPlanGenerator::default(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Reseed the fallback planner so its output is reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn with_fallback(self, fallback: FallbackPlanGenerator<'static>) -> Self {
        Self { fallback, ..self }
    }

    /// Name of the configured provider, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    pub async fn generate(&self, profile: &UserProfile) -> GeneratedPlan {
        match &self.provider {
            Some(provider) => match self.try_provider(provider.as_ref(), profile).await {
                Ok(content) => {
                    info!(provider = provider.name(), "generated plan with AI provider");
                    return GeneratedPlan {
                        content,
                        source: PlanSource::Ai {
                            provider: provider.name().to_owned(),
                        },
                    };
                }
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        error = %err,
                        "AI generation failed, using fallback plan"
                    );
                }
            },
            None => debug!("no AI provider configured, using fallback plan"),
        }

        GeneratedPlan {
            content: self.fallback_content(profile),
            source: PlanSource::Fallback,
        }
    }

    async fn try_provider(
        &self,
        provider: &dyn PlanProvider,
        profile: &UserProfile,
    ) -> Result<PlanContent, GenerationFailure> {
        let content = provider.generate(profile).await?;
        content
            .validate()
            .map_err(|e| GenerationFailure::Parse(e.to_string()))?;
        Ok(content)
    }

    fn fallback_content(&self, profile: &UserProfile) -> PlanContent {
        // A panic while holding the lock cannot leave the RNG in a bad state.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        self.fallback.generate(profile, &mut *rng)
    }
}

impl fmt::Debug for PlanGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanGenerator")
            .field("provider", &self.provider_name())
            .finish_non_exhaustive()
    }
}
