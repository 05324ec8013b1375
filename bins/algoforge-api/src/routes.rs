use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/run", post(handlers::run_code))
        .route("/jobs/history", get(handlers::job_history))
        .route("/jobs/:job_id", get(handlers::get_job))
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
}
