use async_trait::async_trait;
use bench_core::{BenchError, WorkOutput, Workload, WorkloadRequest};
use tracing::debug;

use crate::store::{Connector, KeyValueStore};

/// Writes `key_i -> value_i` and reads it straight back, `rate *
/// keys_per_rate` times. The data is throwaway; only the round trips count.
pub struct CacheWorkload<C> {
    connector: C,
    keys_per_rate: u64,
}

impl<C: Connector> CacheWorkload<C> {
    pub fn new(connector: C, keys_per_rate: u64) -> Self {
        Self {
            connector,
            keys_per_rate,
        }
    }

    pub fn pairs_for(&self, rate: u64) -> u64 {
        rate.saturating_mul(self.keys_per_rate)
    }
}

#[async_trait]
impl<C: Connector> Workload for CacheWorkload<C> {
    async fn run(&self, request: &WorkloadRequest) -> Result<WorkOutput, BenchError> {
        let mut store = self.connector.connect().await?;
        let pairs = self.pairs_for(request.rate);
        for i in 0..pairs {
            let key = format!("key_{i}");
            store.set(&key, &format!("value_{i}")).await?;
            let value = store.get(&key).await?;
            if value.is_none() {
                debug!(%key, "key vanished before read-back");
            }
        }
        Ok(WorkOutput::default())
    }
}
