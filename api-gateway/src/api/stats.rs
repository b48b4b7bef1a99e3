//! Liveness and platform statistics

use std::sync::Arc;

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::response::ApiResponse;
use crate::error::ApiResult;
use crate::exchange::PlatformStats;
use crate::AppState;

/// Health check body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Health {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is up", body = Health)),
    tag = "system"
)]
pub async fn health() -> ApiResponse<Health> {
    ApiResponse::new(Health {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// Platform statistics for polling dashboards
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    responses((status = 200, description = "Current platform statistics", body = PlatformStats)),
    tag = "system"
)]
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse<PlatformStats>> {
    Ok(ApiResponse::new(state.exchange.stats().await?))
}
