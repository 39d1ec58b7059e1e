//! TransactionCache - write transaction records with TTL eviction

use std::time::Duration;

use devmon_core::TransactionRecord;
use moka::future::Cache;
use tracing::debug;

/// Maps transaction IDs to the plugin and device they were issued against.
///
/// Records are never deleted explicitly; they expire `ttl` after insertion.
pub struct TransactionCache {
    inner: Cache<String, TransactionRecord>,
}

impl TransactionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Record a transaction
    pub async fn add(&self, record: TransactionRecord) {
        debug!(
            transaction = %record.transaction,
            plugin_id = %record.plugin,
            device = %record.device,
            "Caching transaction"
        );
        self.inner.insert(record.transaction.clone(), record).await;
    }

    pub async fn get(&self, id: &str) -> Option<TransactionRecord> {
        self.inner.get(id).await
    }

    /// IDs of all live records, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.iter().map(|(k, _)| (*k).clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: &str) -> TransactionRecord {
        TransactionRecord {
            transaction: id.to_string(),
            plugin: "123".to_string(),
            device: "abc".to_string(),
        }
    }

    #[tokio::test]
    async fn add_and_get() {
        let cache = TransactionCache::new(Duration::from_secs(60));
        cache.add(record("t2")).await;
        cache.add(record("t1")).await;

        assert_eq!(cache.get("t1").await, Some(record("t1")));
        assert_eq!(cache.get("t3").await, None);
        assert_eq!(cache.ids(), vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn records_expire() {
        let cache = TransactionCache::new(Duration::from_millis(50));
        cache.add(record("t1")).await;
        assert!(cache.get("t1").await.is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get("t1").await, None);
        assert!(cache.ids().is_empty());
    }
}
