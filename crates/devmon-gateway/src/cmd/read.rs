//! read / read_device / read_cache

use std::sync::Arc;

use async_stream::try_stream;
use devmon_core::{GatewayError, GatewayResult, ReadFilter, Reading};
use devmon_plugin::PluginManager;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tracing::debug;

use super::{normalize_groups, plugin_failure};
use crate::Gateway;

impl Gateway {
    /// Read devices matching any of the tag groups from every plugin.
    ///
    /// With `plugin_id`, only that plugin is read; an unknown ID is a
    /// not-found error. Inactive plugins are skipped unless explicitly
    /// selected. Unlike scan, any plugin error fails the whole read.
    pub async fn read(
        &self,
        ns: Option<&str>,
        groups: &[Vec<String>],
        plugin_id: Option<&str>,
    ) -> GatewayResult<Vec<Reading>> {
        let groups = normalize_groups(ns, groups)?;

        if !self.plugin_manager().has_plugins() {
            self.plugin_manager().refresh().await;
        }

        let plugins = match plugin_id {
            Some(id) => vec![self
                .plugin_manager()
                .get(id)
                .ok_or_else(|| GatewayError::not_found(format!("plugin not found: {}", id)))?],
            None => self
                .plugin_manager()
                .iter()
                .into_iter()
                .filter(|p| {
                    if !p.is_active() {
                        debug!(plugin_id = %p.id(), "Skipping inactive plugin for read");
                    }
                    p.is_active()
                })
                .collect(),
        };

        let filters: Vec<ReadFilter> = if groups.is_empty() {
            vec![ReadFilter::Tags(Vec::new())]
        } else {
            groups.into_iter().map(ReadFilter::Tags).collect()
        };

        let mut readings: Vec<Reading> = Vec::new();
        for plugin in plugins {
            let start = readings.len();
            for filter in &filters {
                let batch = plugin
                    .with_client(|client| async move { client.read(filter).await })
                    .await
                    .map_err(|e| plugin_failure(&plugin, "reading from", e))?;

                // Overlapping groups return the same reading more than once;
                // only exact repeats from this plugin's earlier batches are dropped.
                let known = readings.len();
                for reading in batch {
                    if !readings[start..known].contains(&reading) {
                        readings.push(reading);
                    }
                }
            }
        }

        Ok(readings)
    }

    /// Read a single device through its owning plugin
    pub async fn read_device(&self, device_id: &str) -> GatewayResult<Vec<Reading>> {
        let (device, plugin) = self.resolve_device(device_id).await?;
        let filter = ReadFilter::Device(device.id.clone());

        plugin
            .with_client(|client| async move { client.read(&filter).await })
            .await
            .map_err(|e| plugin_failure(&plugin, "reading from", e))
    }

    /// Stream cached readings from every active plugin, plugin by plugin.
    ///
    /// Each plugin's readings are drained before the next plugin is asked.
    /// The first error ends the stream.
    pub fn read_cache(
        &self,
        start: Option<String>,
        end: Option<String>,
    ) -> BoxStream<'static, GatewayResult<Reading>> {
        Box::pin(cached_readings(self.plugin_manager().clone(), start, end))
    }
}

fn cached_readings(
    plugins: Arc<PluginManager>,
    start: Option<String>,
    end: Option<String>,
) -> impl Stream<Item = GatewayResult<Reading>> + Send + 'static {
    try_stream! {
        if !plugins.has_plugins() {
            plugins.refresh().await;
        }

        let start = start.as_deref();
        let end = end.as_deref();

        for plugin in plugins.iter() {
            if !plugin.is_active() {
                debug!(plugin_id = %plugin.id(), "Skipping inactive plugin for read cache");
                continue;
            }

            let mut readings = plugin
                .with_client(|client| async move { client.read_cache(start, end).await })
                .await
                .map_err(|e| plugin_failure(&plugin, "reading cache from", e))?;

            while let Some(reading) = readings.next().await {
                plugin.observe(&reading);
                let reading = reading.map_err(|e| plugin_failure(&plugin, "reading cache from", e))?;
                yield reading;
            }
        }
    }
}
