//! PluginManager - process-wide registry of plugins

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use devmon_core::{PluginConnector, PluginResult, Protocol};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::PluginSettings;
use crate::discovery::PluginDiscovery;
use crate::plugin::Plugin;

/// Registry of plugins keyed by plugin ID.
///
/// Plugins are added through `register`, which handshakes with the address
/// first. `iter` hands out a snapshot, so registration during a loop over
/// the plugins never invalidates the loop.
pub struct PluginManager {
    plugins: RwLock<HashMap<String, Arc<Plugin>>>,
    connector: Arc<dyn PluginConnector>,
    settings: PluginSettings,
    discovery: Vec<Arc<dyn PluginDiscovery>>,
}

impl PluginManager {
    /// Create an empty registry
    pub fn new(connector: Arc<dyn PluginConnector>, settings: PluginSettings) -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            connector,
            settings,
            discovery: Vec::new(),
        }
    }

    /// Add a discovery source consulted by `discover`
    pub fn with_discovery(mut self, discovery: Arc<dyn PluginDiscovery>) -> Self {
        self.discovery.push(discovery);
        self
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Get a plugin by ID
    pub fn get(&self, id: &str) -> Option<Arc<Plugin>> {
        self.plugins.read().get(id).cloned()
    }

    /// Snapshot of the registered plugins, ordered by ID
    pub fn iter(&self) -> Vec<Arc<Plugin>> {
        let mut plugins: Vec<Arc<Plugin>> = self.plugins.read().values().cloned().collect();
        plugins.sort_by(|a, b| a.id().cmp(b.id()));
        plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    pub fn has_plugins(&self) -> bool {
        !self.is_empty()
    }

    /// Whether every registered plugin is currently active
    pub fn all_active(&self) -> bool {
        self.plugins.read().values().all(|p| p.is_active())
    }

    /// Register the plugin at `address`.
    ///
    /// Runs the metadata and version handshake before touching the
    /// registry; any failure is returned as-is and nothing is added. If a
    /// plugin with the same ID is already registered, the existing entry is
    /// kept and marked active.
    pub async fn register(&self, address: &str, protocol: Protocol) -> PluginResult<String> {
        debug!(address = %address, protocol = %protocol, "Registering plugin");

        let plugin = self.connect(address, protocol).await?;
        let id = plugin.id().to_string();

        let mut plugins = self.plugins.write();
        match plugins.get(&id) {
            Some(existing) => {
                debug!(plugin_id = %id, address = %address, "Plugin already registered");
                existing.mark_active();
            }
            None => {
                info!(
                    plugin_id = %id,
                    plugin = %plugin.tag(),
                    address = %address,
                    protocol = %protocol,
                    "Registered new plugin"
                );
                plugins.insert(id.clone(), Arc::new(plugin));
            }
        }

        Ok(id)
    }

    /// Statically configured plugin addresses
    pub fn load(&self) -> Vec<(String, Protocol)> {
        let addresses = self.settings.addresses();
        debug!(count = addresses.len(), "Loaded plugin addresses from config");
        addresses
    }

    /// Plugin addresses found through service discovery.
    ///
    /// Discovery failures are logged and contribute no addresses.
    pub async fn discover(&self) -> Vec<(String, Protocol)> {
        let mut found = Vec::new();
        for source in &self.discovery {
            match source.discover().await {
                Ok(addresses) => {
                    debug!(
                        source = source.name(),
                        count = addresses.len(),
                        "Discovered plugin addresses"
                    );
                    found.extend(addresses);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Plugin discovery failed");
                }
            }
        }
        found
    }

    /// Reconcile the registry with configured and discovered addresses.
    ///
    /// Every address is registered (failures are logged and skipped). A
    /// registered plugin whose address no longer appears in either source
    /// is handshaked again. If that fails and the same plugin ID answered
    /// at another address during this pass, the entry moves to that
    /// address; otherwise it is dropped.
    pub async fn refresh(&self) {
        let mut addresses = self.load();
        addresses.extend(self.discover().await);

        let mut seen = HashSet::new();
        let mut answered: HashMap<String, (String, Protocol)> = HashMap::new();
        for (address, protocol) in &addresses {
            if !seen.insert(address.clone()) {
                continue;
            }
            match self.register(address, *protocol).await {
                Ok(id) => {
                    answered
                        .entry(id)
                        .or_insert_with(|| (address.clone(), *protocol));
                }
                Err(e) => {
                    warn!(address = %address, protocol = %protocol, error = %e, "Failed to register plugin");
                }
            }
        }

        for plugin in self.iter() {
            if seen.contains(plugin.address()) {
                continue;
            }
            let Err(e) = self.handshake(&plugin).await else {
                continue;
            };
            match answered.get(plugin.id()) {
                Some((address, protocol)) => self.relocate(&plugin, address, *protocol).await,
                None => {
                    info!(
                        plugin_id = %plugin.id(),
                        address = %plugin.address(),
                        error = %e,
                        "Removing plugin no longer configured or reachable"
                    );
                    self.plugins.write().remove(plugin.id());
                }
            }
        }

        debug!(count = self.len(), "Plugin refresh complete");
    }

    /// Replace a plugin whose old address went away with a fresh entry at
    /// the address it now answers on. Keeps the old entry if that fails.
    async fn relocate(&self, plugin: &Plugin, address: &str, protocol: Protocol) {
        match self.connect(address, protocol).await {
            Ok(moved) if moved.id() == plugin.id() => {
                info!(
                    plugin_id = %plugin.id(),
                    from = %plugin.address(),
                    to = %address,
                    "Plugin moved to new address"
                );
                self.plugins
                    .write()
                    .insert(plugin.id().to_string(), Arc::new(moved));
            }
            Ok(other) => {
                warn!(
                    plugin_id = %plugin.id(),
                    address = %address,
                    found = %other.id(),
                    "Address now serves a different plugin, keeping entry"
                );
            }
            Err(e) => {
                warn!(
                    plugin_id = %plugin.id(),
                    address = %address,
                    error = %e,
                    "Failed to move plugin to new address, keeping entry"
                );
            }
        }
    }

    /// Open a client at `address` and build a plugin from its handshake
    async fn connect(&self, address: &str, protocol: Protocol) -> PluginResult<Plugin> {
        let client = self.connector.connect(address, protocol).await?;
        let metadata = client.metadata().await?;
        let version = client.version().await?;
        Plugin::new(metadata, version, address, protocol, client)
    }

    async fn handshake(&self, plugin: &Plugin) -> PluginResult<()> {
        let client = self
            .connector
            .connect(plugin.address(), plugin.protocol())
            .await?;
        client.metadata().await?;
        client.version().await?;
        Ok(())
    }
}
