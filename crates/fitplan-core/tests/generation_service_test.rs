//! Generate-and-store flow and webhook sync against a real database.

use fitplan_core::orchestrator::{PlanGenerator, PlanSource};
use fitplan_core::profile::UserProfile;
use fitplan_core::service::{GenerateRequest, GenerationOutcome, generate_fitness_plan};
use fitplan_core::webhook::{self, WebhookError, WebhookHeaders, WebhookVerifier};
use fitplan_db::queries::{plans, users};
use fitplan_test_utils::{create_test_db, drop_test_db};

fn request(user_id: &str, goal: Option<&str>) -> GenerateRequest {
    GenerateRequest {
        user_id: user_id.to_owned(),
        profile: UserProfile {
            frequency: Some("3".to_owned()),
            goal: goal.map(str::to_owned),
            level: Some("Beginner".to_owned()),
            ..UserProfile::default()
        },
    }
}

#[tokio::test]
async fn generated_plan_is_stored_as_active() {
    let (pool, db_name) = create_test_db().await;
    let generator = PlanGenerator::new(None).with_seed(2);

    let outcome =
        generate_fitness_plan(&pool, &generator, &request("user_a", Some("Weight Loss"))).await;
    let GenerationOutcome::Saved { plan, source } = outcome else {
        panic!("expected a saved plan");
    };
    assert_eq!(source, PlanSource::Fallback);
    assert_eq!(plan.name, "Weight Loss Plan");
    assert_eq!(
        plan.workout_plan.schedule,
        vec!["Monday", "Tuesday", "Wednesday"]
    );

    let active = plans::get_active_plan(&pool, "user_a").await.unwrap().unwrap();
    assert_eq!(active.id, plan.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn regenerating_replaces_active_plan() {
    let (pool, db_name) = create_test_db().await;
    let generator = PlanGenerator::new(None);

    let first = generate_fitness_plan(&pool, &generator, &request("user_a", None)).await;
    let second = generate_fitness_plan(&pool, &generator, &request("user_a", None)).await;
    assert!(first.is_success() && second.is_success());

    let all = plans::get_user_plans(&pool, "user_a").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|p| p.is_active).count(), 1);
    assert_eq!(all[0].name, "Custom Plan");

    let json = serde_json::to_value(&second).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["planId"], all[0].id.to_string());
    assert_eq!(json["source"]["kind"], "fallback");
    assert!(json["workoutPlan"]["schedule"].is_array());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn blank_user_id_fails_without_writing() {
    let (pool, db_name) = create_test_db().await;
    let generator = PlanGenerator::new(None);

    let outcome = generate_fitness_plan(&pool, &generator, &request("  ", None)).await;
    assert!(matches!(
        outcome,
        GenerationOutcome::Failed { ref error } if error == "userId is required"
    ));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM plans")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn persistence_failure_is_reported() {
    let (pool, db_name) = create_test_db().await;
    let generator = PlanGenerator::new(None);
    pool.close().await;

    let outcome = generate_fitness_plan(&pool, &generator, &request("user_a", None)).await;
    assert!(!outcome.is_success());

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn signed_delivery_syncs_user() {
    let (pool, db_name) = create_test_db().await;
    let verifier = WebhookVerifier::new("whsec_dGVzdC13ZWJob29rLXNpZ25pbmcta2V5").unwrap();

    let body = br#"{"type":"user.created","data":{"id":"user_9","first_name":"Grace","last_name":"Hopper","image_url":null,"email_addresses":[{"email_address":"grace@example.com"}]}}"#;
    let ts = chrono::Utc::now().timestamp();
    let signature = verifier.sign("msg_1", ts, body);
    let ts = ts.to_string();
    let headers = WebhookHeaders {
        id: "msg_1",
        timestamp: &ts,
        signature: &signature,
    };

    let user = webhook::handle_delivery(&pool, &verifier, &headers, body)
        .await
        .unwrap()
        .expect("user synced");
    assert_eq!(user.name, "Grace Hopper");

    let stored = users::get_user_by_external_id(&pool, "user_9").await.unwrap().unwrap();
    assert_eq!(stored.email, "grace@example.com");
    assert_eq!(stored.image, None);

    let tampered = br#"{"type":"user.created","data":{"id":"user_evil","email_addresses":[{"email_address":"x@example.com"}]}}"#;
    let err = webhook::handle_delivery(&pool, &verifier, &headers, tampered)
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::NoMatchingSignature));
    assert!(users::get_user_by_external_id(&pool, "user_evil").await.unwrap().is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}
