//! devmon-core - Core traits and types for the devmon device gateway
//!
//! This crate provides the data model shared by every layer (tags, devices,
//! readings, transactions, plugin descriptors), the error taxonomy, and the
//! `PluginClient` / `PluginConnector` traits that sit at the plugin RPC
//! boundary.

pub mod client;
pub mod error;
pub mod models;
pub mod tag;

pub use client::{PluginClient, PluginConnector, ReadFilter, ReadingStream};
pub use error::{GatewayError, GatewayResult, PluginError, PluginResult};
pub use models::*;
pub use tag::{Tag, TagError};
