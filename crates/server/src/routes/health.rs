use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

pub async fn health_check() -> ApiResponse<HealthStatus> {
    ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/health", get(health_check))
}
