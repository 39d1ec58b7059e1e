//! Write and transaction models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single write action sent to a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePayload {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Caller-chosen transaction ID; the plugin generates one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

/// Transaction handle returned by an asynchronous write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteTransaction {
    /// Transaction ID
    pub id: String,
    /// Device written to
    pub device: String,
    /// The write that started the transaction
    pub context: WritePayload,
    /// Time the plugin allows for completion (e.g. "30s")
    #[serde(default)]
    pub timeout: String,
}

/// Lifecycle state of a write transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Pending,
    Writing,
    Done,
    Error,
}

/// Status of a write transaction as reported by the owning plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub id: String,
    /// Device the transaction targets; filled in by the gateway
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    pub status: TransactionState,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timeout: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

/// Gateway-side record linking a transaction to its plugin and device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub transaction: String,
    pub plugin: String,
    pub device: String,
}
