//! In-memory plugin client for tests
//!
//! `MockPluginClient` serves scripted devices and readings and can be told
//! to fail every call. `MockConnector` hands out mock clients by address.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use devmon_core::{
    Device, PluginClient, PluginConnector, PluginError, PluginHealth, PluginMetadata,
    PluginResult, PluginVersion, Protocol, ReadFilter, Reading, ReadingStream, TransactionState,
    TransactionStatus, WritePayload, WriteTransaction,
};
use parking_lot::RwLock;
use uuid::Uuid;

/// Scripted plugin client
pub struct MockPluginClient {
    metadata: PluginMetadata,
    devices: RwLock<Vec<Device>>,
    readings: RwLock<Vec<Reading>>,
    transactions: RwLock<HashMap<String, TransactionStatus>>,
    failure: RwLock<Option<PluginError>>,
    device_calls: AtomicUsize,
}

impl MockPluginClient {
    pub fn new(id: &str, tag: &str) -> Self {
        Self {
            metadata: PluginMetadata {
                id: id.to_string(),
                tag: tag.to_string(),
                name: tag.to_string(),
                maintainer: "vaporio".to_string(),
                description: format!("mock plugin {}", tag),
                vcs: String::new(),
            },
            devices: RwLock::new(Vec::new()),
            readings: RwLock::new(Vec::new()),
            transactions: RwLock::new(HashMap::new()),
            failure: RwLock::new(None),
            device_calls: AtomicUsize::new(0),
        }
    }

    /// Builder-style variant of `set_devices`
    pub fn with_devices(self, devices: Vec<Device>) -> Self {
        self.set_devices(devices);
        self
    }

    pub fn metadata_value(&self) -> PluginMetadata {
        self.metadata.clone()
    }

    /// Replace the devices the plugin reports
    pub fn set_devices(&self, devices: Vec<Device>) {
        *self.devices.write() = devices;
    }

    /// Replace the readings the plugin serves
    pub fn set_readings(&self, readings: Vec<Reading>) {
        *self.readings.write() = readings;
    }

    /// Make every subsequent call fail with `err`
    pub fn fail_with(&self, err: PluginError) {
        *self.failure.write() = Some(err);
    }

    pub fn clear_failure(&self) {
        *self.failure.write() = None;
    }

    /// Number of `devices()` calls served so far
    pub fn device_calls(&self) -> usize {
        self.device_calls.load(Ordering::SeqCst)
    }

    /// Set the status of a known transaction
    pub fn set_transaction_state(&self, id: &str, state: TransactionState) {
        if let Some(status) = self.transactions.write().get_mut(id) {
            status.status = state;
            status.updated = Utc::now().to_rfc3339();
        }
    }

    fn check(&self) -> PluginResult<()> {
        match self.failure.read().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn device_matches(&self, device_id: &str, tags: &[String]) -> bool {
        let devices = self.devices.read();
        devices
            .iter()
            .find(|d| d.id == device_id)
            .map(|d| {
                let device_tags = d.all_tags();
                tags.iter().all(|t| device_tags.contains(t))
            })
            .unwrap_or(false)
    }

    fn new_status(&self, device_id: &str, state: TransactionState) -> TransactionStatus {
        let now = Utc::now().to_rfc3339();
        TransactionStatus {
            id: Uuid::new_v4().to_string(),
            device: device_id.to_string(),
            created: now.clone(),
            updated: now,
            status: state,
            message: String::new(),
            timeout: "30s".to_string(),
            context: Default::default(),
        }
    }
}

#[async_trait]
impl PluginClient for MockPluginClient {
    async fn metadata(&self) -> PluginResult<PluginMetadata> {
        self.check()?;
        Ok(self.metadata.clone())
    }

    async fn version(&self) -> PluginResult<PluginVersion> {
        self.check()?;
        Ok(PluginVersion {
            plugin_version: "1.0.0".to_string(),
            sdk_version: "1.0.0".to_string(),
            ..Default::default()
        })
    }

    async fn health(&self) -> PluginResult<PluginHealth> {
        self.check()?;
        Ok(PluginHealth {
            timestamp: Utc::now().to_rfc3339(),
            status: "OK".to_string(),
            checks: vec![],
        })
    }

    async fn devices(&self) -> PluginResult<Vec<Device>> {
        self.device_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.devices.read().clone())
    }

    async fn read(&self, filter: &ReadFilter) -> PluginResult<Vec<Reading>> {
        self.check()?;
        let readings = self.readings.read().clone();
        let selected = match filter {
            ReadFilter::Device(id) => readings.into_iter().filter(|r| &r.device == id).collect(),
            ReadFilter::Tags(tags) => readings
                .into_iter()
                .filter(|r| self.device_matches(&r.device, tags))
                .collect(),
        };
        Ok(selected)
    }

    async fn read_cache(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> PluginResult<ReadingStream> {
        self.check()?;
        // RFC 3339 timestamps in the same offset compare lexically
        let readings: Vec<PluginResult<Reading>> = self
            .readings
            .read()
            .iter()
            .filter(|r| start.map_or(true, |s| r.timestamp.as_str() >= s))
            .filter(|r| end.map_or(true, |e| r.timestamp.as_str() <= e))
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(futures::stream::iter(readings)))
    }

    async fn write_async(
        &self,
        device_id: &str,
        payloads: &[WritePayload],
    ) -> PluginResult<Vec<WriteTransaction>> {
        self.check()?;
        let mut out = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let mut status = self.new_status(device_id, TransactionState::Pending);
            if let Some(id) = &payload.transaction {
                status.id = id.clone();
            }
            out.push(WriteTransaction {
                id: status.id.clone(),
                device: device_id.to_string(),
                context: payload.clone(),
                timeout: status.timeout.clone(),
            });
            self.transactions.write().insert(status.id.clone(), status);
        }
        Ok(out)
    }

    async fn write_sync(
        &self,
        device_id: &str,
        payloads: &[WritePayload],
    ) -> PluginResult<Vec<TransactionStatus>> {
        self.check()?;
        let mut out = Vec::with_capacity(payloads.len());
        for _ in payloads {
            let status = self.new_status(device_id, TransactionState::Done);
            self.transactions
                .write()
                .insert(status.id.clone(), status.clone());
            out.push(status);
        }
        Ok(out)
    }

    async fn transaction(&self, id: &str) -> PluginResult<TransactionStatus> {
        self.check()?;
        self.transactions
            .read()
            .get(id)
            .cloned()
            .map(|mut status| {
                // The gateway fills in the device from its own record
                status.device.clear();
                status
            })
            .ok_or_else(|| PluginError::Rejected {
                code: 404,
                message: format!("transaction not found: {}", id),
            })
    }
}

/// Connector serving mock clients by address
#[derive(Default)]
pub struct MockConnector {
    clients: RwLock<HashMap<String, Arc<MockPluginClient>>>,
    unreachable: RwLock<HashSet<String>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `client` at `address`
    pub fn add(&self, address: &str, client: Arc<MockPluginClient>) {
        self.clients.write().insert(address.to_string(), client);
    }

    /// Make connections to `address` fail (or succeed again)
    pub fn set_unreachable(&self, address: &str, unreachable: bool) {
        let mut set = self.unreachable.write();
        if unreachable {
            set.insert(address.to_string());
        } else {
            set.remove(address);
        }
    }
}

#[async_trait]
impl PluginConnector for MockConnector {
    async fn connect(
        &self,
        address: &str,
        _protocol: Protocol,
    ) -> PluginResult<Arc<dyn PluginClient>> {
        if self.unreachable.read().contains(address) {
            return Err(PluginError::Transport(format!(
                "connection refused: {}",
                address
            )));
        }
        let client: Arc<dyn PluginClient> =
            self.clients.read().get(address).cloned().ok_or_else(|| {
                PluginError::Transport(format!("no plugin listening at {}", address))
            })?;
        Ok(client)
    }
}
