//! plugins / plugin / plugin_health

use chrono::Utc;
use devmon_core::{
    GatewayError, GatewayResult, HealthSummary, PluginDetail, PluginNetwork, PluginSummary,
};
use tracing::{debug, warn};

use crate::Gateway;

impl Gateway {
    /// Registered plugins, ordered by ID.
    ///
    /// Refreshes the registry first when `refresh` is set or when no
    /// plugins are registered yet.
    pub async fn plugins(&self, refresh: bool) -> Vec<PluginSummary> {
        if refresh || !self.plugin_manager().has_plugins() {
            debug!(refresh, "Refreshing plugins before listing");
            self.plugin_manager().refresh().await;
        }
        self.plugin_manager().iter().iter().map(|p| p.summary()).collect()
    }

    /// Detail of one plugin, including a live health check.
    ///
    /// A failing health check marks the plugin inactive and is reported
    /// as missing health rather than as an error.
    pub async fn plugin(&self, id: &str) -> GatewayResult<PluginDetail> {
        let plugin = self
            .plugin_manager()
            .get(id)
            .ok_or_else(|| GatewayError::not_found(format!("plugin not found: {}", id)))?;

        let health = match plugin
            .with_client(|client| async move { client.health().await })
            .await
        {
            Ok(health) => Some(health),
            Err(e) => {
                warn!(plugin_id = %id, error = %e, "Plugin health check failed");
                None
            }
        };

        Ok(PluginDetail {
            metadata: plugin.metadata().clone(),
            version: plugin.version().clone(),
            network: PluginNetwork {
                address: plugin.address().to_string(),
                protocol: plugin.protocol(),
            },
            active: plugin.is_active(),
            health,
        })
    }

    /// Poll every plugin's health and summarize.
    ///
    /// The gateway is healthy when no plugin reports unhealthy; an empty
    /// registry is healthy.
    pub async fn plugin_health(&self) -> HealthSummary {
        let mut healthy = Vec::new();
        let mut unhealthy = Vec::new();
        let mut active = 0;
        let mut inactive = 0;

        for plugin in self.plugin_manager().iter() {
            let ok = match plugin
                .with_client(|client| async move { client.health().await })
                .await
            {
                Ok(health) => health.is_ok(),
                Err(e) => {
                    debug!(plugin_id = %plugin.id(), error = %e, "Plugin health check failed");
                    false
                }
            };

            if ok {
                healthy.push(plugin.id().to_string());
            } else {
                unhealthy.push(plugin.id().to_string());
            }
            if plugin.is_active() {
                active += 1;
            } else {
                inactive += 1;
            }
        }

        HealthSummary {
            status: if unhealthy.is_empty() {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            updated: Utc::now().to_rfc3339(),
            healthy,
            unhealthy,
            active,
            inactive,
        }
    }
}
