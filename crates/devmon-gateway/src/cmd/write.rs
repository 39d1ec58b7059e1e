//! write_async / write_sync

use devmon_core::{
    GatewayError, GatewayResult, TransactionRecord, TransactionStatus, WritePayload,
    WriteTransaction,
};
use tracing::info;

use super::plugin_failure;
use crate::Gateway;

fn validate(payloads: &[WritePayload]) -> GatewayResult<()> {
    if payloads.is_empty() {
        return Err(GatewayError::invalid_usage("no write payload given"));
    }
    if let Some(i) = payloads.iter().position(|p| p.action.trim().is_empty()) {
        return Err(
            GatewayError::invalid_usage("write payload requires an 'action'")
                .with_context(format!("payload {} has no action", i)),
        );
    }
    Ok(())
}

impl Gateway {
    /// Issue writes to a device without waiting for completion.
    ///
    /// Every returned transaction is recorded so its status can be checked
    /// through [`Gateway::transaction`].
    pub async fn write_async(
        &self,
        device_id: &str,
        payloads: &[WritePayload],
    ) -> GatewayResult<Vec<WriteTransaction>> {
        validate(payloads)?;
        let (device, plugin) = self.resolve_device(device_id).await?;
        let target = device.id.as_str();

        let transactions = plugin
            .with_client(|client| async move { client.write_async(target, payloads).await })
            .await
            .map_err(|e| plugin_failure(&plugin, "writing to", e))?;

        for txn in &transactions {
            self.transaction_cache()
                .add(TransactionRecord {
                    transaction: txn.id.clone(),
                    plugin: plugin.id().to_string(),
                    device: device.id.clone(),
                })
                .await;
        }

        info!(
            device = %device.id,
            plugin_id = %plugin.id(),
            count = transactions.len(),
            "Issued asynchronous write"
        );
        Ok(transactions)
    }

    /// Issue writes to a device and wait for them to finish.
    ///
    /// Returns the final status of each transaction with the device filled
    /// in; the transactions are recorded as with `write_async`.
    pub async fn write_sync(
        &self,
        device_id: &str,
        payloads: &[WritePayload],
    ) -> GatewayResult<Vec<TransactionStatus>> {
        validate(payloads)?;
        let (device, plugin) = self.resolve_device(device_id).await?;
        let target = device.id.as_str();

        let mut statuses = plugin
            .with_client(|client| async move { client.write_sync(target, payloads).await })
            .await
            .map_err(|e| plugin_failure(&plugin, "writing to", e))?;

        for status in &mut statuses {
            status.device = device.id.clone();
            self.transaction_cache()
                .add(TransactionRecord {
                    transaction: status.id.clone(),
                    plugin: plugin.id().to_string(),
                    device: device.id.clone(),
                })
                .await;
        }

        info!(
            device = %device.id,
            plugin_id = %plugin.id(),
            count = statuses.len(),
            "Completed synchronous write"
        );
        Ok(statuses)
    }
}
