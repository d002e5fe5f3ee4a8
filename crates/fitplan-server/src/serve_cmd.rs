use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use fitplan_core::orchestrator::PlanGenerator;
use fitplan_core::profile::ResolvedProfile;
use fitplan_core::service::{self, GenerateRequest};
use fitplan_core::webhook::{self, WebhookHeaders, WebhookVerifier};
use fitplan_db::models::Plan;
use fitplan_db::queries::plans::{self as plan_db, PlanUpdate, StoreError};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub generator: Arc<PlanGenerator>,
    /// `None` when no webhook secret is configured.
    pub webhook: Option<WebhookVerifier>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(_) => Self::unprocessable(err.to_string()),
            StoreError::NotFound(_) => Self::not_found(err.to_string()),
            StoreError::Database(_) => {
                error!(error = %err, "plan store request failed");
                Self::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Store routes get a permissive CORS layer; the generation endpoint sets
/// its own fixed headers, including on preflight.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/users/{user_id}/plans", get(list_user_plans))
        .route("/api/users/{user_id}/plans/active", get(get_active_plan))
        .route(
            "/api/users/{user_id}/plans/{plan_id}/activate",
            post(activate_plan),
        )
        .route(
            "/api/plans/{plan_id}",
            get(get_plan).patch(update_plan).delete(delete_plan),
        )
        .layer(CorsLayer::permissive())
        .route(
            "/api/generate-fitness-plan",
            post(generate_plan).options(generate_preflight),
        )
        .route("/clerk-webhook", post(clerk_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("fitplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("fitplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler the server runs until killed.
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

const ALLOW_ORIGIN: (header::HeaderName, &str) = (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");

fn generation_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, [ALLOW_ORIGIN], Json(body)).into_response()
}

async fn generate_preflight() -> Response {
    (
        StatusCode::OK,
        [
            ALLOW_ORIGIN,
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
        .into_response()
}

/// `POST /api/generate-fitness-plan`: every failure is a 500 with
/// `{"success": false, "error": ...}`.
async fn generate_plan(State(state): State<AppState>, body: Bytes) -> Response {
    let mut request: GenerateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "rejected malformed generation request");
            return generation_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": format!("invalid request body: {e}") }),
            );
        }
    };
    request.profile = request
        .profile
        .with_defaults(&ResolvedProfile::HTTP_DEFAULTS);

    let outcome = service::generate_fitness_plan(&state.pool, &state.generator, &request).await;
    if outcome.is_success() {
        generation_response(StatusCode::OK, json!({ "success": true }))
    } else {
        let body = serde_json::to_value(&outcome)
            .unwrap_or_else(|e| json!({ "success": false, "error": e.to_string() }));
        generation_response(StatusCode::INTERNAL_SERVER_ERROR, body)
    }
}

// ---------------------------------------------------------------------------
// Identity webhook
// ---------------------------------------------------------------------------

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let Some(verifier) = &state.webhook else {
        warn!("webhook delivery received but no secret is configured");
        return (StatusCode::OK, "Webhook not configured");
    };

    let (Some(id), Some(timestamp), Some(signature)) = (
        header_str(&headers, webhook::HEADER_ID),
        header_str(&headers, webhook::HEADER_TIMESTAMP),
        header_str(&headers, webhook::HEADER_SIGNATURE),
    ) else {
        return (StatusCode::BAD_REQUEST, "Missing headers");
    };
    let delivery = WebhookHeaders {
        id,
        timestamp,
        signature,
    };

    match webhook::handle_delivery(&state.pool, verifier, &delivery, &body).await {
        Ok(_) => (StatusCode::OK, "Success"),
        Err(e) => {
            warn!(error = %e, id, "rejected webhook delivery");
            (StatusCode::BAD_REQUEST, "Error")
        }
    }
}

// ---------------------------------------------------------------------------
// Plan store
// ---------------------------------------------------------------------------

async fn list_user_plans(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Plan>>, AppError> {
    Ok(Json(plan_db::get_user_plans(&state.pool, &user_id).await?))
}

async fn get_active_plan(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Plan>, AppError> {
    plan_db::get_active_plan(&state.pool, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("user {user_id} has no active plan")))
}

async fn activate_plan(
    State(state): State<AppState>,
    Path((user_id, plan_id)): Path<(String, Uuid)>,
) -> Result<Json<Plan>, AppError> {
    Ok(Json(
        plan_db::toggle_plan_active(&state.pool, &user_id, plan_id).await?,
    ))
}

async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Plan>, AppError> {
    plan_db::get_plan(&state.pool, plan_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::from(StoreError::NotFound(plan_id)))
}

async fn update_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
    Json(update): Json<PlanUpdate>,
) -> Result<Json<Plan>, AppError> {
    Ok(Json(plan_db::update_plan(&state.pool, plan_id, &update).await?))
}

async fn delete_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if plan_db::delete_plan(&state.pool, plan_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StoreError::NotFound(plan_id).into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
