//! Plugin discovery
//!
//! Discovery sources return plugin addresses found at runtime. The only
//! built-in source queries the Kubernetes endpoints API from inside the
//! cluster, matching endpoints by label and using the port named `http`.

use std::path::Path;

use async_trait::async_trait;
use devmon_core::Protocol;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::KubernetesSettings;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Name of the endpoint port plugins serve on
const PLUGIN_PORT_NAME: &str = "http";

/// Errors from a discovery source
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Discovery is not usable in this environment
    #[error("Discovery not configured: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source of dynamically discovered plugin addresses
#[async_trait]
pub trait PluginDiscovery: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn discover(&self) -> Result<Vec<(String, Protocol)>, DiscoveryError>;
}

// =========================================================================
// Kubernetes endpoints API response types
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct EndpointsList {
    #[serde(default)]
    pub items: Vec<Endpoints>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub subsets: Vec<EndpointSubset>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndpointSubset {
    #[serde(default)]
    pub addresses: Vec<EndpointAddress>,
    #[serde(default)]
    pub ports: Vec<EndpointPort>,
}

#[derive(Debug, Deserialize)]
pub struct EndpointAddress {
    pub ip: String,
}

#[derive(Debug, Deserialize)]
pub struct EndpointPort {
    #[serde(default)]
    pub name: Option<String>,
    pub port: u16,
}

/// Collect `ip:port` addresses for the plugin port of every endpoint
pub fn addresses_from_endpoints(list: &EndpointsList) -> Vec<String> {
    let mut addresses = Vec::new();
    for subset in list.items.iter().flat_map(|e| e.subsets.iter()) {
        let Some(port) = subset
            .ports
            .iter()
            .find(|p| p.name.as_deref() == Some(PLUGIN_PORT_NAME))
        else {
            continue;
        };
        for address in &subset.addresses {
            addresses.push(format!("{}:{}", address.ip, port.port));
        }
    }
    addresses
}

/// Discovers plugins through the in-cluster Kubernetes API
pub struct KubernetesDiscovery {
    settings: KubernetesSettings,
}

impl KubernetesDiscovery {
    pub fn new(settings: KubernetesSettings) -> Self {
        Self { settings }
    }

    fn endpoints_url(&self, host: &str, port: &str) -> Result<Url, DiscoveryError> {
        let mut url = Url::parse(&format!(
            "https://{}:{}/api/v1/namespaces/{}/endpoints",
            host, port, self.settings.namespace
        ))?;
        let selector = self.settings.endpoints.label_selector();
        if !selector.is_empty() {
            url.query_pairs_mut().append_pair("labelSelector", &selector);
        }
        Ok(url)
    }

    async fn client(&self) -> Result<(reqwest::Client, String), DiscoveryError> {
        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = tokio::fs::read_to_string(dir.join("token")).await?;
        let ca = tokio::fs::read(dir.join("ca.crt")).await?;
        let cert = reqwest::Certificate::from_pem(&ca)?;
        let client = reqwest::Client::builder()
            .add_root_certificate(cert)
            .build()?;
        Ok((client, token.trim().to_string()))
    }
}

#[async_trait]
impl PluginDiscovery for KubernetesDiscovery {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    async fn discover(&self) -> Result<Vec<(String, Protocol)>, DiscoveryError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| DiscoveryError::Config("not running in a cluster".to_string()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let url = self.endpoints_url(&host, &port)?;
        let (client, token) = self.client().await?;
        debug!(url = %url, "Querying kubernetes endpoints");

        let list: EndpointsList = client
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(addresses_from_endpoints(&list)
            .into_iter()
            .map(|a| (a, Protocol::Tcp))
            .collect())
    }
}
