//! devmon-plugin - Plugin handles and the plugin registry
//!
//! This crate wraps plugin RPC clients with identity and health state
//! (`Plugin`), keeps the process-wide registry of plugins
//! (`PluginManager`), and provides the address sources the registry
//! reconciles against: static configuration and Kubernetes discovery.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      PluginManager                       │
//! │   load() ──┐                                             │
//! │            ├──► register(address) ──► PluginConnector    │
//! │ discover() ┘          │                    │             │
//! │                       ▼                    ▼             │
//! │          ┌──────────────────────┐   PluginClient         │
//! │          │ id ─► Arc<Plugin>    │   (HTTP / mock)        │
//! │          └──────────────────────┘                        │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod discovery;
pub mod http;
mod manager;
mod plugin;
pub mod testing;

pub use config::PluginSettings;
pub use discovery::{DiscoveryError, KubernetesDiscovery, PluginDiscovery};
pub use http::{HttpConnector, HttpPluginClient};
pub use manager::PluginManager;
pub use plugin::Plugin;

// Re-export core types for convenience
pub use devmon_core::{PluginClient, PluginConnector, PluginError, PluginResult, Protocol};
