//! devmon-cache - In-memory caches for the devmon device gateway
//!
//! - [`DeviceCache`]: tag-string and alias index over the devices reported
//!   by every active plugin, rebuilt wholesale from live plugin queries.
//! - [`TransactionCache`]: transaction ID to `{plugin, device}` records with
//!   TTL eviction.
//!
//! Nothing here is persisted; all state is rebuilt from the plugins.

mod config;
mod device;
mod transaction;

pub use config::CacheSettings;
pub use device::DeviceCache;
pub use transaction::TransactionCache;
