use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use troth_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = HealthCheck::from_result("database", state.db.get(), HealthStatus::Unhealthy);

    Json(HealthResponse::healthy("troth-moderation", env!("CARGO_PKG_VERSION")).with_checks(vec![database]))
}
