//! The `PlanProvider` trait: the adapter interface for hosted models.
//!
//! The trait is object-safe so providers can be stored as
//! `Arc<dyn PlanProvider>` in the [`super::ProviderRegistry`] and injected
//! into the orchestrator.

use async_trait::async_trait;

use fitplan_db::models::PlanContent;

use super::GenerationFailure;
use crate::profile::UserProfile;

/// Produces plan content for a profile by calling an external model.
///
/// One attempt per call; implementations do not retry.
#[async_trait]
pub trait PlanProvider: Send + Sync {
    /// Registry key, e.g. `"openai"`.
    fn name(&self) -> &str;

    async fn generate(&self, profile: &UserProfile) -> Result<PlanContent, GenerationFailure>;
}

// Compile-time assertion: PlanProvider must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanProvider) {}
};
