//! transaction / transactions

use devmon_core::{GatewayError, GatewayResult, TransactionStatus};
use tracing::error;

use super::plugin_failure;
use crate::Gateway;

impl Gateway {
    /// Current status of a write transaction, with the device filled in
    pub async fn transaction(&self, id: &str) -> GatewayResult<TransactionStatus> {
        let record = self
            .transaction_cache()
            .get(id)
            .await
            .ok_or_else(|| GatewayError::not_found(format!("transaction not found: {}", id)))?;

        if record.plugin.is_empty() {
            error!(transaction = %id, "Cached transaction has no plugin");
            return Err(
                GatewayError::server("transaction record is missing its plugin")
                    .with_context(format!("transaction {}", id)),
            );
        }

        let plugin = self.plugin_manager().get(&record.plugin).ok_or_else(|| {
            GatewayError::not_found(format!("plugin not found: {}", record.plugin))
                .with_context(format!("owner of transaction {}", id))
        })?;

        let mut status = plugin
            .with_client(|client| async move { client.transaction(id).await })
            .await
            .map_err(|e| plugin_failure(&plugin, "checking transaction with", e))?;

        status.device = record.device;
        Ok(status)
    }

    /// IDs of the transactions currently tracked, sorted
    pub fn transactions(&self) -> Vec<String> {
        self.transaction_cache().ids()
    }
}
