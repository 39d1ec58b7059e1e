//! Plugin handlers

use axum::extract::{Path, State};
use axum::Json;
use devmon_core::{HealthSummary, PluginDetail, PluginSummary};

use super::{params, RawQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /plugin
/// List registered plugins; `refresh=true` reconciles the registry first
pub async fn list_plugins(
    State(state): State<AppState>,
    query: RawQuery,
) -> Result<Json<Vec<PluginSummary>>, ApiError> {
    let params = params(query, &["refresh"])?;
    let refresh = params.flag("refresh")?;
    Ok(Json(state.gateway.plugins(refresh).await))
}

/// GET /plugin/{plugin_id}
pub async fn get_plugin(
    State(state): State<AppState>,
    Path(plugin_id): Path<String>,
) -> Result<Json<PluginDetail>, ApiError> {
    Ok(Json(state.gateway.plugin(&plugin_id).await?))
}

/// GET /plugin/health
pub async fn plugin_health(State(state): State<AppState>) -> Json<HealthSummary> {
    Json(state.gateway.plugin_health().await)
}
