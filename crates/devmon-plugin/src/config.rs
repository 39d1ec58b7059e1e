//! Plugin configuration
//!
//! Static plugin addresses, discovery settings and plugin RPC timing.

use std::collections::BTreeMap;
use std::time::Duration;

use devmon_core::Protocol;
use serde::{Deserialize, Serialize};

/// Lower bound for the plugin RPC timeout; zero would fail every call
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// `[plugin]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Plugin addresses reached over TCP ("host:port")
    #[serde(default)]
    pub tcp: Vec<String>,
    /// Plugin unix socket paths
    #[serde(default)]
    pub unix: Vec<String>,
    /// Per-call RPC timeout in seconds, at least one
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Interval of the plugin refresh task in seconds
    #[serde(default = "default_refresh_every_secs")]
    pub refresh_every_secs: u64,
    /// Dynamic plugin discovery
    #[serde(default)]
    pub discover: DiscoverySettings,
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_refresh_every_secs() -> u64 {
    120
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            tcp: Vec::new(),
            unix: Vec::new(),
            timeout_secs: default_timeout_secs(),
            refresh_every_secs: default_refresh_every_secs(),
            discover: DiscoverySettings::default(),
        }
    }
}

impl PluginSettings {
    /// Configured plugin addresses, TCP first, then unix sockets
    pub fn addresses(&self) -> Vec<(String, Protocol)> {
        self.tcp
            .iter()
            .map(|a| (a.clone(), Protocol::Tcp))
            .chain(self.unix.iter().map(|a| (a.clone(), Protocol::Unix)))
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs).max(MIN_TIMEOUT)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_every_secs)
    }
}

/// `[plugin.discover]` configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesSettings>,
}

/// `[plugin.discover.kubernetes]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesSettings {
    /// Namespace to search for plugin endpoints
    #[serde(default = "default_k8s_namespace")]
    pub namespace: String,
    /// Endpoint selection
    #[serde(default)]
    pub endpoints: EndpointSelector,
}

fn default_k8s_namespace() -> String {
    "default".to_string()
}

/// Label selector for plugin endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointSelector {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl EndpointSelector {
    /// Render the labels as a Kubernetes label selector ("k=v,k2=v2")
    pub fn label_selector(&self) -> String {
        self.labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}
