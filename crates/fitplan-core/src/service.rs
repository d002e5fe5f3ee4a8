//! Generate-and-store entry point shared by the HTTP server and the CLI.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use fitplan_db::models::{DietPlan, Plan, WorkoutPlan};
use fitplan_db::queries::plans;

use crate::orchestrator::{PlanGenerator, PlanSource};
use crate::profile::UserProfile;

/// A generation request: who the plan is for and their answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(flatten)]
    pub profile: UserProfile,
}

/// Result of [`generate_fitness_plan`]. Failures are values, not errors.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    Saved { plan: Plan, source: PlanSource },
    Failed { error: String },
}

/// Wire shape: `{success: true, workoutPlan, dietPlan, planId, source}` or
/// `{success: false, error}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeBody<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    workout_plan: Option<&'a WorkoutPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diet_plan: Option<&'a DietPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a PlanSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Serialize for GenerationOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            GenerationOutcome::Saved { plan, source } => OutcomeBody {
                success: true,
                workout_plan: Some(&plan.workout_plan),
                diet_plan: Some(&plan.diet_plan),
                plan_id: Some(plan.id),
                source: Some(source),
                error: None,
            },
            GenerationOutcome::Failed { error } => OutcomeBody {
                success: false,
                workout_plan: None,
                diet_plan: None,
                plan_id: None,
                source: None,
                error: Some(error),
            },
        };
        body.serialize(serializer)
    }
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Saved { .. })
    }

    fn failed(error: impl Into<String>) -> Self {
        GenerationOutcome::Failed {
            error: error.into(),
        }
    }
}

/// Name given to a freshly generated plan.
pub fn plan_name(profile: &UserProfile) -> String {
    format!("{} Plan", profile.goal().unwrap_or("Custom"))
}

/// Generate a plan for `request.user_id` and store it as their active plan.
///
/// Generation itself cannot fail; a missing user ID or a store error is
/// reported as [`GenerationOutcome::Failed`].
pub async fn generate_fitness_plan(
    pool: &PgPool,
    generator: &PlanGenerator,
    request: &GenerateRequest,
) -> GenerationOutcome {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return GenerationOutcome::failed("userId is required");
    }

    let generated = generator.generate(&request.profile).await;
    let name = plan_name(&request.profile);

    match plans::create_plan(
        pool,
        user_id,
        &name,
        &generated.content.workout_plan,
        &generated.content.diet_plan,
    )
    .await
    {
        Ok(plan) => {
            info!(user_id, plan_id = %plan.id, source = %generated.source, "saved generated plan");
            GenerationOutcome::Saved {
                plan,
                source: generated.source,
            }
        }
        Err(err) => {
            error!(user_id, error = %err, "failed to save generated plan");
            GenerationOutcome::failed(err.to_string())
        }
    }
}
