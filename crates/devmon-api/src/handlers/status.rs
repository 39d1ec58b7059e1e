//! Liveness and version handlers

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use devmon_gateway::VersionInfo;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct TestResponse {
    pub status: String,
    pub timestamp: String,
}

/// GET /test
pub async fn test() -> Json<TestResponse> {
    Json(TestResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// GET /version
pub async fn version(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(state.gateway.version())
}
