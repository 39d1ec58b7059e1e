//! Gateway commands
//!
//! Each submodule adds one family of commands to [`Gateway`]. Commands are
//! stateless: they consult the caches and the plugin registry and return
//! `GatewayResult`s the API layer maps onto HTTP responses.

mod plugin;
mod read;
mod scan;
mod transaction;
mod write;

use std::sync::Arc;

use devmon_core::tag::{with_namespace, DEFAULT_NAMESPACE};
use devmon_core::{Device, GatewayError, GatewayResult, PluginError, Tag};
use devmon_plugin::Plugin;

use crate::Gateway;

pub use scan::SortKey;

/// Qualify unnamespaced tags with `ns` (or `default`) and validate them.
///
/// Empty groups are dropped.
pub(crate) fn normalize_groups(
    ns: Option<&str>,
    groups: &[Vec<String>],
) -> GatewayResult<Vec<Vec<String>>> {
    let ns = ns.filter(|ns| !ns.is_empty()).unwrap_or(DEFAULT_NAMESPACE);

    groups
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| {
            group
                .iter()
                .map(|tag| -> GatewayResult<String> {
                    let tag = with_namespace(tag, ns);
                    tag.parse::<Tag>().map_err(|e| {
                        GatewayError::invalid_usage(format!("invalid tag: {}", tag))
                            .with_context(e.to_string())
                    })?;
                    Ok(tag)
                })
                .collect()
        })
        .collect()
}

/// Wrap a failed plugin call into a server error naming the plugin
pub(crate) fn plugin_failure(plugin: &Plugin, action: &str, err: PluginError) -> GatewayError {
    GatewayError::server(format!("error {} plugin {}", action, plugin.id()))
        .with_context(err.to_string())
}

impl Gateway {
    /// Resolve a device by ID or alias together with its owning plugin
    pub(crate) async fn resolve_device(
        &self,
        device_id: &str,
    ) -> GatewayResult<(Arc<Device>, Arc<Plugin>)> {
        let device = self
            .device_cache()
            .lookup_device(device_id)
            .await
            .ok_or_else(|| GatewayError::not_found(format!("device not found: {}", device_id)))?;

        let plugin = self.plugin_manager().get(&device.plugin).ok_or_else(|| {
            GatewayError::not_found(format!("plugin not found: {}", device.plugin))
                .with_context(format!("device {} references an unregistered plugin", device.id))
        })?;

        Ok((device, plugin))
    }
}
