//! Application state for the API

use devmon_gateway::Gateway;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }
}
