//! API error type and its HTTP rendering

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use devmon_core::GatewayError;
use serde::{Deserialize, Serialize};

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub http_code: u16,
    pub error: String,
    pub description: String,
    pub timestamp: String,
    pub context: String,
}

impl ApiError {
    pub fn invalid_usage(description: impl Into<String>) -> Self {
        ApiError(GatewayError::invalid_usage(description))
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(GatewayError::invalid_usage("invalid JSON body").with_context(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(
            GatewayError::invalid_usage("invalid query string").with_context(rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = err.kind(), description = %err.description(), context = ?err.context(), "API error");
        } else {
            tracing::debug!(error = err.kind(), description = %err.description(), "API client error");
        }

        let body = Json(ErrorResponse {
            http_code: status.as_u16(),
            error: err.kind().to_string(),
            description: err.description().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            context: err.context().unwrap_or_default().to_string(),
        });

        (status, body).into_response()
    }
}
