//! Database query functions for the `users` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::debug;

use crate::models::User;

/// Fields mirrored from the identity provider when a user signs up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

/// Insert a user, or refresh the profile fields if `external_id` is known.
pub async fn upsert_user(pool: &PgPool, user: &NewUser) -> Result<User> {
    let row = sqlx::query_as::<_, User>(
        "INSERT INTO users (external_id, email, name, image) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (external_id) DO UPDATE \
         SET email = EXCLUDED.email, \
             name = EXCLUDED.name, \
             image = EXCLUDED.image, \
             updated_at = now() \
         RETURNING *",
    )
    .bind(&user.external_id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.image.as_deref())
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to upsert user {}", user.external_id))?;

    debug!(external_id = %row.external_id, "upserted user");
    Ok(row)
}

/// Look up a user by identity-provider ID.
pub async fn get_user_by_external_id(pool: &PgPool, external_id: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = $1")
        .bind(external_id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to fetch user {external_id}"))?;

    Ok(row)
}
