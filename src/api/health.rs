use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub user: String,
    pub tenant: String,
    pub failure_policy: String,
    pub timestamp: String,
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET /health - Liveness plus the mailbox this instance sends from.
/// Makes no outbound calls.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        user: state.config.user.clone(),
        tenant: state.config.tenant.clone(),
        failure_policy: state.config.failure_policy.as_str().to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
