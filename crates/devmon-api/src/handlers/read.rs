//! Read handlers

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use devmon_core::{GatewayError, Reading};
use futures::StreamExt;

use super::{params, RawQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// Content type of the streamed read cache
pub const NDJSON: &str = "application/x-ndjson";

/// GET /read
///
/// Query: `ns`, `tags` (repeatable, comma-separated), `plugin`
pub async fn read(
    State(state): State<AppState>,
    query: RawQuery,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let params = params(query, &["ns", "tags", "plugin"])?;
    let readings = state
        .gateway
        .read(params.get("ns"), &params.tag_groups(), params.get("plugin"))
        .await?;
    Ok(Json(readings))
}

/// GET /read/{device_id}
pub async fn read_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    Ok(Json(state.gateway.read_device(&device_id).await?))
}

/// GET /readcache
///
/// Streams one JSON reading per line. An error after the response has
/// started ends the body early.
pub async fn read_cache(
    State(state): State<AppState>,
    query: RawQuery,
) -> Result<Response, ApiError> {
    let params = params(query, &["start", "end"])?;
    let start = params.get("start").map(String::from);
    let end = params.get("end").map(String::from);

    let lines = state.gateway.read_cache(start, end).map(|item| {
        let reading = item?;
        let mut line = serde_json::to_string(&reading).map_err(|e| {
            GatewayError::server("failed to encode reading").with_context(e.to_string())
        })?;
        line.push('\n');
        Ok::<_, GatewayError>(line)
    });

    Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(lines)).into_response())
}
