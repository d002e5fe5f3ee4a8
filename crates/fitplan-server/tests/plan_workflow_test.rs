//! Integration tests for the flows behind `fitplan generate` and
//! `fitplan plan ...`.
//!
//! These run against a real PostgreSQL instance. Each test creates an
//! isolated temporary database and drops it on completion.

use fitplan_core::orchestrator::{PlanGenerator, PlanSource};
use fitplan_core::profile::UserProfile;
use fitplan_core::service::{GenerateRequest, GenerationOutcome, generate_fitness_plan};
use fitplan_db::queries::plans::{self, PlanUpdate, StoreError};
use fitplan_test_utils::{create_test_db, drop_test_db};

fn request(user_id: &str, frequency: &str, goal: &str) -> GenerateRequest {
    GenerateRequest {
        user_id: user_id.to_owned(),
        profile: UserProfile {
            frequency: Some(frequency.to_owned()),
            goal: Some(goal.to_owned()),
            level: Some("Beginner".to_owned()),
            ..UserProfile::default()
        },
    }
}

async fn generate(
    generator: &PlanGenerator,
    pool: &sqlx::PgPool,
    req: &GenerateRequest,
) -> uuid::Uuid {
    match generate_fitness_plan(pool, generator, req).await {
        GenerationOutcome::Saved { plan, source } => {
            assert_eq!(source, PlanSource::Fallback);
            plan.id
        }
        GenerationOutcome::Failed { error } => panic!("generation failed: {error}"),
    }
}

#[tokio::test]
async fn generate_list_activate_rename_delete() {
    let (pool, db_name) = create_test_db().await;
    let generator = PlanGenerator::new(None).with_seed(11);

    // generate twice: the second plan replaces the first as active.
    let cut = generate(&generator, &pool, &request("user_cli", "3", "Weight Loss")).await;
    let bulk = generate(&generator, &pool, &request("user_cli", "5 days", "Muscle Gain")).await;

    let listed = plans::get_user_plans(&pool, "user_cli").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![bulk, cut]);
    assert_eq!(listed[0].name, "Muscle Gain Plan");
    assert_eq!(listed[0].workout_plan.schedule.len(), 5);
    assert!(listed[0].is_active && !listed[1].is_active);

    // plan activate
    let activated = plans::toggle_plan_active(&pool, "user_cli", cut).await.unwrap();
    assert!(activated.is_active);
    let active = plans::get_active_plan(&pool, "user_cli").await.unwrap().unwrap();
    assert_eq!(active.id, cut);

    // plan rename keeps activation and content.
    let renamed = plans::update_plan(
        &pool,
        cut,
        &PlanUpdate {
            name: Some("Summer Cut".to_owned()),
            ..PlanUpdate::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.name, "Summer Cut");
    assert!(renamed.is_active);
    assert_eq!(renamed.workout_plan, active.workout_plan);
    assert!(renamed.updated_at >= active.updated_at);

    // plan rename rejects a blank name.
    let blank = plans::update_plan(
        &pool,
        cut,
        &PlanUpdate {
            name: Some("   ".to_owned()),
            ..PlanUpdate::default()
        },
    )
    .await;
    assert!(matches!(blank, Err(StoreError::Validation(_))));

    // plan delete of the active plan leaves no active plan.
    assert!(plans::delete_plan(&pool, cut).await.unwrap());
    assert!(!plans::delete_plan(&pool, cut).await.unwrap());
    assert!(plans::get_active_plan(&pool, "user_cli").await.unwrap().is_none());
    assert_eq!(plans::get_user_plans(&pool, "user_cli").await.unwrap().len(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn seeded_generation_is_reproducible() {
    let (pool, db_name) = create_test_db().await;

    let a = generate(
        &PlanGenerator::new(None).with_seed(5),
        &pool,
        &request("user_a", "4", "Endurance"),
    )
    .await;
    let b = generate(
        &PlanGenerator::new(None).with_seed(5),
        &pool,
        &request("user_b", "4", "Endurance"),
    )
    .await;

    let a = plans::get_plan(&pool, a).await.unwrap().unwrap();
    let b = plans::get_plan(&pool, b).await.unwrap().unwrap();
    assert_eq!(a.content(), b.content());

    pool.close().await;
    drop_test_db(&db_name).await;
}
