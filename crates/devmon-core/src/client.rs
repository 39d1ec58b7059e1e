//! PluginClient trait - the RPC boundary between the gateway and a plugin

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::PluginResult;
use crate::models::{
    Device, PluginHealth, PluginMetadata, PluginVersion, Protocol, Reading, TransactionStatus,
    WritePayload, WriteTransaction,
};

/// Stream of readings pulled from a plugin's reading cache
pub type ReadingStream = BoxStream<'static, PluginResult<Reading>>;

/// Selects which devices a read targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFilter {
    /// Devices matching every tag (all devices when empty)
    Tags(Vec<String>),
    /// A single device by ID
    Device(String),
}

/// Client handle for a single plugin.
///
/// Implementations validate payload shape when decoding responses, so
/// everything past this boundary works with typed records. Failures are
/// reported as `PluginError`.
#[async_trait]
pub trait PluginClient: Send + Sync {
    // =========================================================================
    // Handshake
    // =========================================================================

    /// Plugin identity metadata
    async fn metadata(&self) -> PluginResult<PluginMetadata>;

    /// Plugin build/version information
    async fn version(&self) -> PluginResult<PluginVersion>;

    /// Plugin health status
    async fn health(&self) -> PluginResult<PluginHealth>;

    // =========================================================================
    // Devices and readings
    // =========================================================================

    /// All devices the plugin manages
    async fn devices(&self) -> PluginResult<Vec<Device>>;

    /// Current readings for the selected devices
    async fn read(&self, filter: &ReadFilter) -> PluginResult<Vec<Reading>>;

    /// Readings from the plugin's own reading cache, bounded by optional
    /// RFC 3339 start/end times
    async fn read_cache(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> PluginResult<ReadingStream>;

    // =========================================================================
    // Writes
    // =========================================================================

    /// Queue writes and return one transaction per payload
    async fn write_async(
        &self,
        device_id: &str,
        payloads: &[WritePayload],
    ) -> PluginResult<Vec<WriteTransaction>>;

    /// Write and wait for completion, returning the final statuses
    async fn write_sync(
        &self,
        device_id: &str,
        payloads: &[WritePayload],
    ) -> PluginResult<Vec<TransactionStatus>>;

    /// Status of a write transaction
    async fn transaction(&self, id: &str) -> PluginResult<TransactionStatus>;
}

/// Opens plugin clients for addresses.
///
/// Registration goes through a connector so that the handshake runs against
/// a fresh client before anything is added to the registry.
#[async_trait]
pub trait PluginConnector: Send + Sync {
    async fn connect(
        &self,
        address: &str,
        protocol: Protocol,
    ) -> PluginResult<Arc<dyn PluginClient>>;
}
