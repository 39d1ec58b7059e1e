//! Write and transaction handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use devmon_core::{TransactionStatus, WritePayload, WriteTransaction};
use serde::Deserialize;

use super::{params, RawQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// Write body: one payload or a list of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WriteBody {
    One(WritePayload),
    Many(Vec<WritePayload>),
}

impl WriteBody {
    fn into_payloads(self) -> Vec<WritePayload> {
        match self {
            WriteBody::One(payload) => vec![payload],
            WriteBody::Many(payloads) => payloads,
        }
    }
}

/// POST /write/{device_id}
pub async fn write_async(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    query: RawQuery,
    body: Result<Json<WriteBody>, JsonRejection>,
) -> Result<Json<Vec<WriteTransaction>>, ApiError> {
    params(query, &[])?;
    let Json(body) = body?;
    let payloads = body.into_payloads();
    Ok(Json(state.gateway.write_async(&device_id, &payloads).await?))
}

/// POST /write/wait/{device_id}
pub async fn write_sync(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    query: RawQuery,
    body: Result<Json<WriteBody>, JsonRejection>,
) -> Result<Json<Vec<TransactionStatus>>, ApiError> {
    params(query, &[])?;
    let Json(body) = body?;
    let payloads = body.into_payloads();
    Ok(Json(state.gateway.write_sync(&device_id, &payloads).await?))
}

/// GET /transaction
pub async fn list_transactions(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.gateway.transactions())
}

/// GET /transaction/{transaction_id}
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionStatus>, ApiError> {
    Ok(Json(state.gateway.transaction(&transaction_id).await?))
}
