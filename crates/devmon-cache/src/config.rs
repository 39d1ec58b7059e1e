//! Cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `[cache]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Interval of the device cache rebuild task in seconds
    #[serde(default = "default_device_rebuild_every_secs")]
    pub device_rebuild_every_secs: u64,
    /// Lifetime of a transaction record in seconds
    #[serde(default = "default_transaction_ttl_secs")]
    pub transaction_ttl_secs: u64,
}

fn default_device_rebuild_every_secs() -> u64 {
    180
}

fn default_transaction_ttl_secs() -> u64 {
    300
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            device_rebuild_every_secs: default_device_rebuild_every_secs(),
            transaction_ttl_secs: default_transaction_ttl_secs(),
        }
    }
}

impl CacheSettings {
    pub fn rebuild_interval(&self) -> Duration {
        Duration::from_secs(self.device_rebuild_every_secs)
    }

    pub fn transaction_ttl(&self) -> Duration {
        Duration::from_secs(self.transaction_ttl_secs)
    }
}
