//! Shared data models for the gateway and its plugins

mod device;
mod plugin;
mod reading;
mod transaction;

pub use device::*;
pub use plugin::*;
pub use reading::*;
pub use transaction::*;
