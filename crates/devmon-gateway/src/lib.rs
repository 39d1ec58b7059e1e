//! devmon-gateway - Command layer for the devmon device gateway
//!
//! [`Gateway`] is the application context: it owns the plugin registry,
//! the device cache and the transaction cache, and every command is a
//! method on it. The HTTP layer holds a `Gateway` and translates requests
//! into calls on it.
//!
//! ```text
//!   devmon-api ──► Gateway ──► DeviceCache ──┐
//!                     │                      ├──► PluginManager ──► Plugin ──► PluginClient
//!                     └──► TransactionCache  │
//!   tasks::spawn ─────────────────────────────┘
//! ```

mod cmd;
mod gateway;
pub mod tasks;

pub use cmd::SortKey;
pub use gateway::{Gateway, VersionInfo, API_VERSION};
