use std::time::Duration;

use crate::services::kv::{KvBackend, KvError};

const ATTEMPT_KEY_PREFIX: &str = "greyscale:attempts:";

/// Bounded, expiring fetch-attempt counter per source URL.
///
/// A counter is only created when a fetch fails, and expires on its own TTL,
/// so an unreachable source never grows permanent state. The key embeds the
/// URL itself rather than a hash of it: a hash collision would conflate the
/// retry budgets of distinct sources.
#[derive(Clone)]
pub struct RetryLedger<K> {
    kv: K,
    ttl: Duration,
}

impl<K: KvBackend> RetryLedger<K> {
    pub fn new(kv: K, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Current attempt count for a source (0 if none recorded).
    pub async fn attempts(&self, url: &str) -> Result<u64, KvError> {
        let value = self.kv.get(&format!("{ATTEMPT_KEY_PREFIX}{url}")).await?;
        match value {
            Some(raw) => raw.parse().map_err(|_| KvError::NonNumericCounter {
                key: format!("{ATTEMPT_KEY_PREFIX}{url}"),
            }),
            None => Ok(0),
        }
    }

    /// Record a failed fetch and return the new attempt count.
    ///
    /// The increment is atomic at the store, so concurrently redelivered
    /// copies of the same failing job observe distinct counts.
    pub async fn record_failure(&self, url: &str) -> Result<u64, KvError> {
        self.kv
            .incr_ex(&format!("{ATTEMPT_KEY_PREFIX}{url}"), self.ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::kv::MemoryKv;

    fn ledger(ttl: Duration) -> RetryLedger<MemoryKv> {
        RetryLedger::new(MemoryKv::new(), ttl)
    }

    #[tokio::test]
    async fn unseen_source_has_zero_attempts() {
        let ledger = ledger(Duration::from_secs(60));
        assert_eq!(ledger.attempts("https://a.example/x.png").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failures_count_up_per_source() {
        let ledger = ledger(Duration::from_secs(60));
        assert_eq!(ledger.record_failure("https://a.example/x").await.unwrap(), 1);
        assert_eq!(ledger.record_failure("https://a.example/x").await.unwrap(), 2);
        // A different source keeps its own counter.
        assert_eq!(ledger.record_failure("https://b.example/y").await.unwrap(), 1);
        assert_eq!(ledger.attempts("https://a.example/x").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn counter_expires_and_resets() {
        let ledger = ledger(Duration::from_millis(10));
        ledger.record_failure("https://a.example/x").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ledger.attempts("https://a.example/x").await.unwrap(), 0);
        assert_eq!(ledger.record_failure("https://a.example/x").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_failures_lose_no_counts() {
        let ledger = ledger(Duration::from_secs(60));
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.record_failure("https://a.example/x").await })
            })
            .collect();
        let counts: Vec<u64> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert_eq!(ledger.attempts("https://a.example/x").await.unwrap(), 32);
        // Every increment observed a distinct count.
        let mut sorted = counts.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), counts.len());
    }
}
