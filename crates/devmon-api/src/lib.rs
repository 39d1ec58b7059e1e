//! devmon-api - HTTP API for the device gateway
//!
//! Every route lives under `/v1` and maps onto one `Gateway` command.
//! Errors render as a JSON body carrying the HTTP code, error kind,
//! description and context.
//!
//! # Usage
//!
//! ```ignore
//! use devmon_api::{create_router, AppState};
//!
//! let state = AppState::new(gateway);
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod query;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway REST router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let v1 = Router::new()
        .route("/test", get(handlers::status::test))
        .route("/version", get(handlers::status::version))
        // Plugins
        .route("/plugin", get(handlers::plugins::list_plugins))
        .route("/plugin/health", get(handlers::plugins::plugin_health))
        .route("/plugin/{plugin_id}", get(handlers::plugins::get_plugin))
        // Devices
        .route("/scan", get(handlers::devices::scan))
        .route("/tags", get(handlers::devices::tags))
        .route("/info/{device_id}", get(handlers::devices::info))
        // Reads
        .route("/read", get(handlers::read::read))
        .route("/read/{device_id}", get(handlers::read::read_device))
        .route("/readcache", get(handlers::read::read_cache))
        // Writes and transactions
        .route("/write/{device_id}", post(handlers::write::write_async))
        .route("/write/wait/{device_id}", post(handlers::write::write_sync))
        .route("/transaction", get(handlers::write::list_transactions))
        .route(
            "/transaction/{transaction_id}",
            get(handlers::write::get_transaction),
        );

    Router::new()
        .nest("/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
