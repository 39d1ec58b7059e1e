//! Plugin - a single backend device source with a liveness flag

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use devmon_core::{
    PluginClient, PluginError, PluginMetadata, PluginResult, PluginSummary, PluginVersion,
    Protocol,
};
use tracing::{info, warn};

/// A registered plugin.
///
/// Holds one shared client and an active flag. The flag is updated by
/// `with_client` based on the outcome of each call, and read by the cache
/// rebuild to skip plugins known to be down.
pub struct Plugin {
    metadata: PluginMetadata,
    version: PluginVersion,
    address: String,
    protocol: Protocol,
    client: Arc<dyn PluginClient>,
    active: AtomicBool,
}

impl Plugin {
    /// Create a plugin from its handshake results.
    ///
    /// Fails when the metadata lacks an `id` or `tag`. New plugins start
    /// active.
    pub fn new(
        metadata: PluginMetadata,
        version: PluginVersion,
        address: impl Into<String>,
        protocol: Protocol,
        client: Arc<dyn PluginClient>,
    ) -> PluginResult<Self> {
        if metadata.tag.is_empty() {
            return Err(PluginError::InvalidMetadata(
                "plugin metadata is missing 'tag'".to_string(),
            ));
        }
        if metadata.id.is_empty() {
            return Err(PluginError::InvalidMetadata(
                "plugin metadata is missing 'id'".to_string(),
            ));
        }

        Ok(Self {
            metadata,
            version,
            address: address.into(),
            protocol,
            client,
            active: AtomicBool::new(true),
        })
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn tag(&self) -> &str {
        &self.metadata.tag
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn version(&self) -> &PluginVersion {
        &self.version
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark the plugin active. Logs only on transition.
    pub fn mark_active(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            info!(plugin_id = %self.id(), plugin = %self.tag(), "Plugin marked active");
        }
    }

    /// Mark the plugin inactive. Logs only on transition.
    pub fn mark_inactive(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            warn!(plugin_id = %self.id(), plugin = %self.tag(), "Plugin marked inactive");
        }
    }

    /// Record the outcome of a plugin call on the health flag.
    ///
    /// Success marks the plugin active; any error except a benign
    /// plugin-side rejection marks it inactive.
    pub fn observe<T>(&self, result: &PluginResult<T>) {
        match result {
            Ok(_) => self.mark_active(),
            Err(e) if e.is_benign() => {}
            Err(e) => {
                warn!(plugin_id = %self.id(), error = %e, "Plugin call failed");
                self.mark_inactive();
            }
        }
    }

    /// Run one logical operation against the plugin's client.
    ///
    /// The health flag is updated exactly once from the operation's result.
    pub async fn with_client<F, Fut, T>(&self, f: F) -> PluginResult<T>
    where
        F: FnOnce(Arc<dyn PluginClient>) -> Fut,
        Fut: Future<Output = PluginResult<T>>,
    {
        let result = f(self.client.clone()).await;
        self.observe(&result);
        result
    }

    /// Listing entry for this plugin
    pub fn summary(&self) -> PluginSummary {
        PluginSummary {
            id: self.metadata.id.clone(),
            tag: self.metadata.tag.clone(),
            name: self.metadata.name.clone(),
            description: self.metadata.description.clone(),
            maintainer: self.metadata.maintainer.clone(),
            active: self.is_active(),
        }
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.metadata.id)
            .field("tag", &self.metadata.tag)
            .field("address", &self.address)
            .field("protocol", &self.protocol)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPluginClient;

    fn plugin(client: Arc<MockPluginClient>) -> Plugin {
        Plugin::new(
            client.metadata_value(),
            PluginVersion::default(),
            "localhost:5001",
            Protocol::Tcp,
            client,
        )
        .unwrap()
    }

    #[test]
    fn new_requires_id_and_tag() {
        let client = Arc::new(MockPluginClient::new("123", "vaporio/test"));

        let mut meta = client.metadata_value();
        meta.tag.clear();
        let err = Plugin::new(meta, PluginVersion::default(), "a", Protocol::Tcp, client.clone())
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidMetadata(_)));

        let mut meta = client.metadata_value();
        meta.id.clear();
        let err =
            Plugin::new(meta, PluginVersion::default(), "a", Protocol::Tcp, client).unwrap_err();
        assert!(matches!(err, PluginError::InvalidMetadata(_)));
    }

    #[test]
    fn starts_active() {
        let p = plugin(Arc::new(MockPluginClient::new("123", "vaporio/test")));
        assert!(p.is_active());
        assert_eq!(p.id(), "123");
        assert_eq!(p.tag(), "vaporio/test");
    }

    #[test]
    fn mark_is_idempotent() {
        let p = plugin(Arc::new(MockPluginClient::new("123", "vaporio/test")));
        p.mark_inactive();
        p.mark_inactive();
        assert!(!p.is_active());
        p.mark_active();
        p.mark_active();
        assert!(p.is_active());
    }

    #[tokio::test]
    async fn with_client_failure_marks_inactive() {
        let client = Arc::new(MockPluginClient::new("123", "vaporio/test"));
        let p = plugin(client.clone());

        client.fail_with(PluginError::Transport("connection refused".into()));
        let result = p.with_client(|c| async move { c.devices().await }).await;
        assert!(result.is_err());
        assert!(!p.is_active());

        client.clear_failure();
        let result = p.with_client(|c| async move { c.devices().await }).await;
        assert!(result.is_ok());
        assert!(p.is_active());
    }

    #[tokio::test]
    async fn with_client_rejection_keeps_health() {
        let client = Arc::new(MockPluginClient::new("123", "vaporio/test"));
        let p = plugin(client);

        let result = p
            .with_client(|c| async move { c.transaction("missing").await })
            .await;
        assert!(matches!(result, Err(PluginError::Rejected { .. })));
        assert!(p.is_active());
    }
}
