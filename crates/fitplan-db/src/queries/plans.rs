//! Database query functions for the `plans` table.
//!
//! Every mutation that changes activation runs in one transaction holding a
//! per-user advisory lock, so at most one plan per user is active at any
//! observable instant. The partial unique index
//! `plans_one_active_per_user_idx` backs this at the schema level.

use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{DietPlan, Plan, PlanContentError, WorkoutPlan};

/// Errors returned by plan store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid plan: {0}")]
    Validation(#[from] PlanContentError),

    #[error("plan {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Partial update for [`update_plan`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub workout_plan: Option<WorkoutPlan>,
    pub diet_plan: Option<DietPlan>,
}

impl PlanUpdate {
    fn validate(&self) -> Result<(), PlanContentError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(PlanContentError::EmptyName);
            }
        }
        if let Some(workout) = &self.workout_plan {
            workout.validate()?;
        }
        if let Some(diet) = &self.diet_plan {
            diet.validate()?;
        }
        Ok(())
    }
}

/// Serialize activation changes for one user until the transaction ends.
async fn lock_user(conn: &mut PgConnection, user_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Flip every active plan of `user_id` to inactive. Returns how many changed.
async fn deactivate_user_plans(conn: &mut PgConnection, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE plans SET is_active = FALSE, updated_at = now() \
         WHERE user_id = $1 AND is_active",
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Insert a new active plan for `user_id`, deactivating any plan that was
/// active before.
///
/// Content is validated before the transaction starts; nothing is written
/// when validation fails.
pub async fn create_plan(
    pool: &PgPool,
    user_id: &str,
    name: &str,
    workout_plan: &WorkoutPlan,
    diet_plan: &DietPlan,
) -> Result<Plan, StoreError> {
    if name.trim().is_empty() {
        return Err(PlanContentError::EmptyName.into());
    }
    workout_plan.validate()?;
    diet_plan.validate()?;

    let mut tx = pool.begin().await?;
    lock_user(&mut tx, user_id).await?;

    let deactivated = deactivate_user_plans(&mut tx, user_id).await?;

    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans (user_id, name, workout_plan, diet_plan, is_active) \
         VALUES ($1, $2, $3, $4, TRUE) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(name)
    .bind(Json(workout_plan))
    .bind(Json(diet_plan))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(user_id, plan_id = %plan.id, deactivated, "created active plan");
    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, plan_id: Uuid) -> Result<Option<Plan>, StoreError> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(plan_id)
        .fetch_optional(pool)
        .await?;

    Ok(plan)
}

/// List every plan of a user, newest first.
pub async fn get_user_plans(pool: &PgPool, user_id: &str) -> Result<Vec<Plan>, StoreError> {
    let plans = sqlx::query_as::<_, Plan>(
        "SELECT * FROM plans WHERE user_id = $1 ORDER BY created_at DESC, updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(plans)
}

/// Return the user's active plan, if any.
pub async fn get_active_plan(pool: &PgPool, user_id: &str) -> Result<Option<Plan>, StoreError> {
    let plan = sqlx::query_as::<_, Plan>(
        "SELECT * FROM plans WHERE user_id = $1 AND is_active \
         ORDER BY updated_at DESC \
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(plan)
}

/// Merge the provided fields into a plan and refresh `updated_at`.
///
/// Activation state is never touched here.
pub async fn update_plan(
    pool: &PgPool,
    plan_id: Uuid,
    update: &PlanUpdate,
) -> Result<Plan, StoreError> {
    update.validate()?;

    let plan = sqlx::query_as::<_, Plan>(
        "UPDATE plans \
         SET name = COALESCE($2, name), \
             workout_plan = COALESCE($3, workout_plan), \
             diet_plan = COALESCE($4, diet_plan), \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(update.name.as_deref())
    .bind(update.workout_plan.as_ref().map(Json))
    .bind(update.diet_plan.as_ref().map(Json))
    .fetch_optional(pool)
    .await?;

    let plan = plan.ok_or(StoreError::NotFound(plan_id))?;
    debug!(plan_id = %plan.id, "updated plan");
    Ok(plan)
}

/// Delete a plan unconditionally. Returns `false` when no such plan existed.
///
/// No other plan is promoted, so deleting the active plan leaves the user
/// without one.
pub async fn delete_plan(pool: &PgPool, plan_id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM plans WHERE id = $1")
        .bind(plan_id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    debug!(%plan_id, deleted, "delete plan");
    Ok(deleted)
}

/// Make `plan_id` the active plan for `user_id`.
///
/// Ownership is not checked: callers must verify that the plan belongs to
/// the user. If it belongs to someone else, that owner's other active plans
/// are deactivated as well so neither user ends up with two.
pub async fn toggle_plan_active(
    pool: &PgPool,
    user_id: &str,
    plan_id: Uuid,
) -> Result<Plan, StoreError> {
    let mut tx = pool.begin().await?;

    let owner: Option<(String,)> = sqlx::query_as("SELECT user_id FROM plans WHERE id = $1")
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await?;
    let (owner,) = owner.ok_or(StoreError::NotFound(plan_id))?;

    // Lock in a fixed order so two cross-user toggles cannot deadlock.
    let mut users = vec![user_id, owner.as_str()];
    users.sort_unstable();
    users.dedup();
    for user in &users {
        lock_user(&mut tx, user).await?;
    }
    for user in &users {
        deactivate_user_plans(&mut tx, user).await?;
    }

    let plan = sqlx::query_as::<_, Plan>(
        "UPDATE plans SET is_active = TRUE, updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(plan_id)
    .fetch_optional(&mut *tx)
    .await?
    // Deleted between the owner lookup and the lock.
    .ok_or(StoreError::NotFound(plan_id))?;

    tx.commit().await?;

    if owner != user_id {
        tracing::warn!(user_id, owner = %owner, %plan_id, "activated a plan owned by another user");
    }
    info!(user_id, %plan_id, "activated plan");
    Ok(plan)
}
