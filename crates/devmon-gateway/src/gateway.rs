//! Gateway - application context shared by commands, tasks and the API

use std::sync::Arc;
use std::time::Duration;

use devmon_cache::{CacheSettings, DeviceCache, TransactionCache};
use devmon_plugin::PluginManager;
use serde::{Deserialize, Serialize};

/// Version of the HTTP API served by the gateway
pub const API_VERSION: &str = "v1";

/// Gateway and API version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub api_version: String,
}

/// Owns the process-wide plugin registry and caches.
///
/// Cheap to clone; clones share the same registry and caches.
#[derive(Clone)]
pub struct Gateway {
    plugins: Arc<PluginManager>,
    devices: Arc<DeviceCache>,
    transactions: Arc<TransactionCache>,
    rebuild_interval: Duration,
}

impl Gateway {
    pub fn new(plugins: PluginManager, cache: &CacheSettings) -> Self {
        Self {
            plugins: Arc::new(plugins),
            devices: Arc::new(DeviceCache::new()),
            transactions: Arc::new(TransactionCache::new(cache.transaction_ttl())),
            rebuild_interval: cache.rebuild_interval(),
        }
    }

    pub fn plugin_manager(&self) -> &Arc<PluginManager> {
        &self.plugins
    }

    pub fn device_cache(&self) -> &DeviceCache {
        &self.devices
    }

    pub fn transaction_cache(&self) -> &TransactionCache {
        &self.transactions
    }

    /// Interval of the device cache rebuild task
    pub fn rebuild_interval(&self) -> Duration {
        self.rebuild_interval
    }

    /// Interval of the plugin refresh task
    pub fn refresh_interval(&self) -> Duration {
        self.plugins.settings().refresh_interval()
    }

    pub fn version(&self) -> VersionInfo {
        VersionInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_version: API_VERSION.to_string(),
        }
    }
}
