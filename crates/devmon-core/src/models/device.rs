//! Device models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tag::Tag;

/// A device as reported by its plugin.
///
/// Devices are immutable snapshots; a cache rebuild replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Globally unique device ID
    pub id: String,
    /// Human-friendly alias, empty when unset
    #[serde(default)]
    pub alias: String,
    /// ID of the plugin that owns the device
    pub plugin: String,
    /// Device type (e.g. "temperature", "led")
    #[serde(rename = "type")]
    pub device_type: String,
    /// Human-readable description
    #[serde(default)]
    pub info: String,
    /// Arbitrary plugin-supplied metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Ordering hint used by scan sorting
    #[serde(default)]
    pub sort_index: i32,
    /// Tags attached to the device
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Reading outputs the device produces
    #[serde(default)]
    pub outputs: Vec<DeviceOutput>,
    /// Read/write capabilities
    #[serde(default)]
    pub capabilities: DeviceCapabilities,
    /// When the plugin produced this record
    #[serde(default)]
    pub timestamp: String,
}

/// A reading output of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub output_type: String,
    #[serde(default)]
    pub precision: i32,
    #[serde(default)]
    pub scaling_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

/// Unit of measure for an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub symbol: String,
}

/// Device read/write capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// "r", "w" or "rw"
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub write: WriteCapability,
}

/// Write actions a device accepts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCapability {
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Device {
    /// String forms of all tags the device is indexed under.
    ///
    /// Always includes the identity tag, appended when the plugin did not
    /// declare it.
    pub fn all_tags(&self) -> Vec<String> {
        let id_tag = Tag::id_tag(&self.id);
        let mut tags: Vec<String> = self.tags.iter().map(Tag::to_string).collect();
        if !tags.contains(&id_tag) {
            tags.push(id_tag);
        }
        tags
    }

    /// Project the device into its scan summary
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            id: self.id.clone(),
            alias: self.alias.clone(),
            info: self.info.clone(),
            device_type: self.device_type.clone(),
            plugin: self.plugin.clone(),
            sort_index: self.sort_index,
            tags: self.tags.iter().map(Tag::to_string).collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Project the device into its full detail view
    pub fn detail(&self) -> DeviceDetail {
        DeviceDetail {
            summary: self.summary(),
            capabilities: self.capabilities.clone(),
            outputs: self.outputs.clone(),
            timestamp: self.timestamp.clone(),
        }
    }
}

/// Device projection returned by scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: String,
    pub alias: String,
    pub info: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub plugin: String,
    pub sort_index: i32,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Device projection returned by info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDetail {
    #[serde(flatten)]
    pub summary: DeviceSummary,
    pub capabilities: DeviceCapabilities,
    pub outputs: Vec<DeviceOutput>,
    pub timestamp: String,
}
