//! DeviceCache - tag and alias index over plugin devices

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use devmon_core::{Device, GatewayError, GatewayResult, Tag};
use devmon_plugin::PluginManager;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Device index keyed by tag string, plus an alias index.
///
/// Every device is reachable through its identity tag (`system/id:<id>`).
/// A rebuild assembles fresh indexes outside the locks and swaps them in,
/// so readers see either the previous content or the new content, never a
/// partially populated bucket. A failed rebuild leaves the previous content
/// in place.
#[derive(Default)]
pub struct DeviceCache {
    devices: Mutex<BTreeMap<String, Vec<Arc<Device>>>>,
    aliases: Mutex<HashMap<String, Arc<Device>>>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild both indexes from the devices of every active plugin.
    ///
    /// When the registry is empty or has inactive plugins, a plugin refresh
    /// runs first. Inactive plugins are skipped. A transport failure from a
    /// plugin is logged and the plugin contributes nothing; any other
    /// plugin error aborts the rebuild and is returned.
    pub async fn rebuild(&self, plugins: &PluginManager) -> GatewayResult<()> {
        if !plugins.has_plugins() || !plugins.all_active() {
            debug!("Refreshing plugins before device cache rebuild");
            plugins.refresh().await;
        }

        let mut index: BTreeMap<String, Vec<Arc<Device>>> = BTreeMap::new();
        let mut aliases: HashMap<String, Arc<Device>> = HashMap::new();
        let mut count = 0usize;

        for plugin in plugins.iter() {
            if !plugin.is_active() {
                debug!(plugin_id = %plugin.id(), "Skipping inactive plugin");
                continue;
            }

            let devices = match plugin
                .with_client(|client| async move { client.devices().await })
                .await
            {
                Ok(devices) => devices,
                Err(e) if e.is_transport() => {
                    warn!(
                        plugin_id = %plugin.id(),
                        error = %e,
                        "Failed to get devices from plugin, skipping"
                    );
                    continue;
                }
                Err(e) => {
                    error!(
                        plugin_id = %plugin.id(),
                        error = %e,
                        "Unexpected error getting devices, aborting cache rebuild"
                    );
                    return Err(GatewayError::server("failed to rebuild device cache")
                        .with_context(e.to_string()));
                }
            };

            for device in devices {
                let device = Arc::new(device);
                if !device.alias.is_empty() {
                    aliases.insert(device.alias.clone(), device.clone());
                }
                for tag in device.all_tags() {
                    index.entry(tag).or_default().push(device.clone());
                }
                count += 1;
            }
        }

        let tags = index.len();
        {
            let mut current = self.devices.lock().await;
            let mut current_aliases = self.aliases.lock().await;
            *current = index;
            *current_aliases = aliases;
        }

        info!(devices = count, tags, "Rebuilt device cache");
        Ok(())
    }

    /// Find a device by ID, falling back to alias
    pub async fn lookup_device(&self, id_or_alias: &str) -> Option<Arc<Device>> {
        let id_tag = Tag::id_tag(id_or_alias);
        {
            let devices = self.devices.lock().await;
            if let Some(device) = devices.get(&id_tag).and_then(|bucket| bucket.first()) {
                return Some(device.clone());
            }
        }
        self.aliases.lock().await.get(id_or_alias).cloned()
    }

    /// Devices carrying every one of `tags`.
    ///
    /// With no tags, every cached device. Results are deduplicated by
    /// device ID and keep the order of the first tag's bucket.
    pub async fn lookup_devices(&self, tags: &[String]) -> Vec<Arc<Device>> {
        let devices = self.devices.lock().await;

        let Some((first, rest)) = tags.split_first() else {
            return dedup(devices.values().flatten());
        };

        let Some(bucket) = devices.get(first) else {
            return Vec::new();
        };
        let mut result = dedup(bucket.iter());

        for tag in rest {
            let ids: HashSet<&str> = match devices.get(tag) {
                Some(bucket) if !bucket.is_empty() => {
                    bucket.iter().map(|d| d.id.as_str()).collect()
                }
                _ => return Vec::new(),
            };
            result.retain(|d| ids.contains(d.id.as_str()));
            if result.is_empty() {
                break;
            }
        }
        result
    }

    /// Snapshot of the populated tag keys
    pub async fn tags(&self) -> Vec<String> {
        self.devices.lock().await.keys().cloned().collect()
    }

    /// ID of the plugin owning the device
    pub async fn get_plugin(&self, device_id: &str) -> Option<String> {
        self.lookup_device(device_id)
            .await
            .map(|device| device.plugin.clone())
    }
}

fn dedup<'a>(devices: impl Iterator<Item = &'a Arc<Device>>) -> Vec<Arc<Device>> {
    let mut seen = HashSet::new();
    devices
        .filter(|d| seen.insert(d.id.clone()))
        .cloned()
        .collect()
}
