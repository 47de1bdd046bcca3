use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use troth_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = HealthCheck::from_result("database", state.db.get(), HealthStatus::Unhealthy);
    // Email code throttling degrades without redis
    let redis = HealthCheck::from_result("redis", state.redis.ping().await, HealthStatus::Degraded);

    Json(HealthResponse::healthy("troth-auth", env!("CARGO_PKG_VERSION")).with_checks(vec![database, redis]))
}
