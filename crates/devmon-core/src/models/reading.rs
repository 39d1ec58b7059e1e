//! Reading models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Unit;

/// A single reading produced by a device output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// ID of the device the reading came from
    pub device: String,
    /// Type of the device
    #[serde(default)]
    pub device_type: String,
    /// Reading type (output name)
    #[serde(rename = "type")]
    pub reading_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    pub value: serde_json::Value,
    /// RFC 3339 time the reading was taken
    pub timestamp: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}
