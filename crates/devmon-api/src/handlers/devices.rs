//! Device discovery handlers: scan, tags, info

use axum::extract::{Path, State};
use axum::Json;
use devmon_core::{DeviceDetail, DeviceSummary};

use super::{params, RawQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /scan
///
/// Query: `ns`, `tags` (repeatable, comma-separated), `force`, `sort`
pub async fn scan(
    State(state): State<AppState>,
    query: RawQuery,
) -> Result<Json<Vec<DeviceSummary>>, ApiError> {
    let params = params(query, &["ns", "tags", "force", "sort"])?;
    let devices = state
        .gateway
        .scan(
            params.get("ns"),
            &params.tag_groups(),
            params.get("sort"),
            params.flag("force")?,
        )
        .await?;
    Ok(Json(devices))
}

/// GET /tags
///
/// Query: `ns` (repeatable, comma-separated), `ids`
pub async fn tags(
    State(state): State<AppState>,
    query: RawQuery,
) -> Result<Json<Vec<String>>, ApiError> {
    let params = params(query, &["ns", "ids"])?;
    let with_ids = params.flag("ids")?;
    Ok(Json(state.gateway.tags(&params.list("ns"), with_ids).await))
}

/// GET /info/{device_id}
pub async fn info(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceDetail>, ApiError> {
    Ok(Json(state.gateway.info(&device_id).await?))
}
