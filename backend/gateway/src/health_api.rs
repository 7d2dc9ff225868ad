//! Gateway Health API
//!
//! Liveness report for load balancers and `docsnap status`.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}
