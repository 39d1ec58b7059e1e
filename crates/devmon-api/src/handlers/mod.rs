//! HTTP request handlers
//!
//! Handlers parse the request, call one `Gateway` command and render its
//! result as JSON.

pub mod devices;
pub mod plugins;
pub mod read;
pub mod status;
pub mod write;

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;

use crate::error::ApiError;
use crate::query::Params;

/// Raw query pairs as extracted by axum
pub type RawQuery = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Validate the raw query against the keys an endpoint accepts
pub(crate) fn params(query: RawQuery, allowed: &[&str]) -> Result<Params, ApiError> {
    let Query(pairs) = query?;
    Params::parse(pairs, allowed)
}
