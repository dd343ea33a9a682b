//! REST handlers for the privacy pipeline and operational endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use orbit_core::OrbitError;
use orbit_platform::audit::AuditLogEntry;
use orbit_platform::{can_access, AuditRecorder, Role};
use orbit_privacy::{DataSubjectRequest, DeletionJob, DsrKind, PrivacyPipeline, Snapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PrivacyPipeline>,
    pub audit: Arc<AuditRecorder>,
    pub service_name: String,
    pub start_time: Instant,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

fn error_response(e: OrbitError) -> ApiError {
    let status = match &e {
        OrbitError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        OrbitError::NotFound(_) => StatusCode::NOT_FOUND,
        OrbitError::InvalidTransition { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.code().to_string(),
            message: e.to_string(),
        }),
    )
}

// ─── Data-subject requests ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub subject_id: Uuid,
    pub kind: DsrKind,
}

#[derive(Debug, Deserialize)]
pub struct ActorBody {
    pub actor_id: Uuid,
}

pub async fn create_request(
    State(state): State<AppState>,
    Json(body): Json<CreateRequestBody>,
) -> (StatusCode, Json<DataSubjectRequest>) {
    let request = state.pipeline.create_request(body.subject_id, body.kind);
    metrics::counter!("api.privacy.requests.created").increment(1);
    (StatusCode::CREATED, Json(request))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataSubjectRequest>, StatusCode> {
    state
        .pipeline
        .get_request(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn advance_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorBody>,
) -> Result<Json<DataSubjectRequest>, ApiError> {
    state
        .pipeline
        .advance_to_processing(id, body.actor_id)
        .map(Json)
        .map_err(error_response)
}

pub async fn list_subject_requests(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Json<Vec<DataSubjectRequest>> {
    Json(state.pipeline.list_requests_for_subject(subject_id))
}

// ─── Exports ───────────────────────────────────────────────────────────────

pub async fn serve_export(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Snapshot>, ApiError> {
    state
        .pipeline
        .serve_export(subject_id)
        .map(Json)
        .map_err(error_response)
}

// ─── Deletion jobs ─────────────────────────────────────────────────────────

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletionJob>, StatusCode> {
    state
        .pipeline
        .get_job(id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn process_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorBody>,
) -> Result<Json<DeletionJob>, ApiError> {
    state
        .pipeline
        .process_job(id, body.actor_id)
        .map(Json)
        .map_err(error_response)
}

pub async fn requeue_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorBody>,
) -> Result<Json<DeletionJob>, ApiError> {
    state
        .pipeline
        .requeue_job(id, body.actor_id)
        .map(Json)
        .map_err(error_response)
}

// ─── Access checks ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AccessCheckBody {
    #[serde(default)]
    pub assigned_roles: Vec<Role>,
    pub required_minimum: Role,
}

#[derive(Debug, Serialize)]
pub struct AccessCheckResponse {
    pub allowed: bool,
}

/// Role-check entry point used by every presentation route that needs a
/// visibility decision, not just the privacy pipeline.
pub async fn access_check(Json(body): Json<AccessCheckBody>) -> Json<AccessCheckResponse> {
    Json(AccessCheckResponse {
        allowed: can_access(&body.assigned_roles, body.required_minimum),
    })
}

// ─── Audit log ─────────────────────────────────────────────────────────────

pub async fn audit_log(State(state): State<AppState>) -> Json<Vec<AuditLogEntry>> {
    Json(state.audit.query(None, None, 200))
}

// ─── Operational endpoints ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub uptime_secs: u64,
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.service_name.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe for Kubernetes.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
