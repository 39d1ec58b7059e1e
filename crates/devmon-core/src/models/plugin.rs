//! Plugin descriptor models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Transport a plugin is reached over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Unix,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Unix => f.write_str("unix"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "unix" => Ok(Protocol::Unix),
            _ => Err(format!("Unknown plugin protocol: '{}'", s)),
        }
    }
}

/// Identity metadata returned by a plugin's `metadata` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub maintainer: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vcs: String,
}

/// Build/version information returned by a plugin's `version` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginVersion {
    #[serde(default)]
    pub plugin_version: String,
    #[serde(default)]
    pub sdk_version: String,
    #[serde(default)]
    pub build_date: String,
    #[serde(default)]
    pub git_commit: String,
    #[serde(default)]
    pub git_tag: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub os: String,
}

/// Result of a plugin's `health` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginHealth {
    pub timestamp: String,
    /// "OK", "DEGRADED", "FAILING", ...
    pub status: String,
    #[serde(default)]
    pub checks: Vec<HealthCheck>,
}

impl PluginHealth {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// A single named health check inside a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub check_type: String,
}

/// Plugin listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSummary {
    pub id: String,
    pub tag: String,
    pub name: String,
    pub description: String,
    pub maintainer: String,
    pub active: bool,
}

/// Full plugin view, including live health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDetail {
    #[serde(flatten)]
    pub metadata: PluginMetadata,
    pub version: PluginVersion,
    pub network: PluginNetwork,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<PluginHealth>,
}

/// Where a plugin is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginNetwork {
    pub address: String,
    pub protocol: Protocol,
}

/// Aggregate health of all registered plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// "healthy" when every plugin answered OK, otherwise "unhealthy"
    pub status: String,
    pub updated: String,
    pub healthy: Vec<String>,
    pub unhealthy: Vec<String>,
    pub active: usize,
    pub inactive: usize,
}
