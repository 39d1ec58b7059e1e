//! Periodic background tasks
//!
//! Two independent loops keep the gateway current: one rebuilds the device
//! cache, the other refreshes the plugin registry. Both tick immediately on
//! start, log failures and never exit on their own.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::Gateway;

/// Shortest interval a task will run at
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Handles to the running background tasks
pub struct BackgroundTasks {
    pub rebuild: JoinHandle<()>,
    pub refresh: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Stop both tasks
    pub fn abort(&self) {
        self.rebuild.abort();
        self.refresh.abort();
    }
}

/// Spawn the device cache rebuild and plugin refresh loops
pub fn spawn(gateway: Gateway) -> BackgroundTasks {
    let rebuild_every = gateway.rebuild_interval().max(MIN_INTERVAL);
    let refresh_every = gateway.refresh_interval().max(MIN_INTERVAL);

    info!(
        rebuild_every_secs = rebuild_every.as_secs(),
        refresh_every_secs = refresh_every.as_secs(),
        "Starting background tasks"
    );

    BackgroundTasks {
        rebuild: tokio::spawn(rebuild_devices(gateway.clone(), rebuild_every)),
        refresh: tokio::spawn(refresh_plugins(gateway, refresh_every)),
    }
}

async fn rebuild_devices(gateway: Gateway, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        debug!("Rebuilding device cache");
        if let Err(e) = gateway
            .device_cache()
            .rebuild(gateway.plugin_manager())
            .await
        {
            error!(error = %e, context = ?e.context(), "Periodic device cache rebuild failed");
        }
    }
}

async fn refresh_plugins(gateway: Gateway, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        debug!("Refreshing plugins");
        gateway.plugin_manager().refresh().await;
    }
}
