// HTTP route handlers for the AlgoForge execution API

use algoforge_common::types::{ErrorResponse, RunRequest, RunResponse};
use algoforge_engine::{ExecutionError, ExecutionRequest, Outcome, StoreError};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

/// Opaque owner identity, as established by whatever sits in front of us
pub const OWNER_HEADER: &str = "x-owner-id";

fn owner_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(OWNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn error_response(status: StatusCode, text: impl Into<String>, job_id: Option<Uuid>) -> Response {
    (status, Json(ErrorResponse::new(text, job_id))).into_response()
}

fn status_for(err: &ExecutionError) -> StatusCode {
    match err {
        e if e.is_caller_error() => StatusCode::BAD_REQUEST,
        ExecutionError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /run - Compile and run one submission synchronously
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            info!(error = %rejection.body_text(), "Malformed run request body");
            metrics::record_rejection(metrics::UNKNOWN_LANGUAGE, "invalid_request");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text(), None);
        }
    };
    let language_label = metrics::language_label(payload.language.as_deref());

    let request = match ExecutionRequest::parse(
        payload.language.as_deref(),
        payload.code,
        payload.input,
        owner_from(&headers),
    ) {
        Ok(request) => request,
        Err(e) => {
            info!(language = %language_label, error = %e, "Rejected run request");
            let reason = match &e {
                ExecutionError::UnsupportedLanguage(_) => Outcome::UnsupportedLanguage.as_str(),
                _ => "invalid_request",
            };
            metrics::record_rejection(language_label, reason);
            return error_response(status_for(&e), e.to_string(), None);
        }
    };

    let language = request.language;
    let _in_flight = metrics::InFlightGuard::enter();

    match state.orchestrator.run(request).await {
        Ok(outcome) => {
            metrics::record_execution(language, outcome.result.outcome, outcome.result.elapsed_ms);
            if outcome.result.is_success() {
                (
                    StatusCode::OK,
                    Json(RunResponse {
                        source_path: outcome.source_path().clone(),
                        output: outcome.job.output.clone(),
                        job_id: outcome.job.id,
                    }),
                )
                    .into_response()
            } else {
                error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    outcome.job.output.clone(),
                    Some(outcome.job.id),
                )
            }
        }
        Err(e) => {
            let status = status_for(&e);
            if status == StatusCode::SERVICE_UNAVAILABLE {
                warn!(language = %language, "Execution capacity exhausted");
                metrics::record_rejection(language.as_str(), "busy");
            } else if status.is_server_error() {
                error!(language = %language, error = %e, "Run request failed");
                metrics::record_rejection(language.as_str(), "internal_error");
            } else {
                metrics::record_rejection(language.as_str(), "invalid_request");
            }
            error_response(status, e.to_string(), e.job_id())
        }
    }
}

/// GET /jobs/history - The caller's jobs, newest first
pub async fn job_history(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(owner) = owner_from(&headers) else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            format!("missing {} header", OWNER_HEADER),
            None,
        );
    };

    match state.orchestrator.store().list_for_owner(&owner).await {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list job history");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
        }
    }
}

/// GET /jobs/{job_id} - One job record, if the caller may see it
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response {
    let job_uuid = match Uuid::parse_str(&job_id) {
        Ok(id) => id,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid job ID format", None),
    };

    let requester = owner_from(&headers);
    match state.orchestrator.store().get(job_uuid, requester.as_deref()).await {
        Ok(Some(job)) => (StatusCode::OK, Json(job)).into_response(),
        Ok(None) => {
            let e = StoreError::NotFound(job_uuid);
            error_response(StatusCode::NOT_FOUND, e.to_string(), None)
        }
        Err(e) => {
            error!(job_id = %job_uuid, error = %e, "Failed to fetch job");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
        }
    }
}

/// GET /status - Health check with admission headroom
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "availableSlots": state.orchestrator.available_slots(),
            "languages": state
                .orchestrator
                .languages()
                .list()
                .iter()
                .map(|config| config.name.as_str())
                .collect::<Vec<_>>(),
        })),
    )
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_endpoint() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
