use crate::core::rate::ExchangeRate;
use crate::store::SeedStore;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use tracing::debug;

const SLOT_KEY: &[u8] = b"last_known_rate";

/// Fjall-backed seed slot under the application data directory.
pub struct FjallSeedStore {
    _keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallSeedStore {
    pub fn new(data_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_path)?;
        let keyspace = fjall::Config::new(data_path.join("cache")).open()?;
        let partition =
            keyspace.open_partition("exchange_rate", PartitionCreateOptions::default())?;
        Ok(Self {
            _keyspace: keyspace,
            partition,
        })
    }
}

#[async_trait]
impl SeedStore for FjallSeedStore {
    async fn get(&self) -> Option<ExchangeRate> {
        match self.partition.get(SLOT_KEY) {
            Ok(Some(raw)) => match serde_json::from_slice(&raw) {
                Ok(rate) => {
                    debug!("Seed HIT: {:?}", rate);
                    Some(rate)
                }
                Err(e) => {
                    debug!("FjallSeedStore decode error: {}", e);
                    None
                }
            },
            Ok(None) => {
                debug!("Seed MISS");
                None
            }
            Err(e) => {
                debug!("FjallSeedStore get error: {}", e);
                None
            }
        }
    }

    async fn set(&self, rate: ExchangeRate) {
        let res: Result<()> = (|| {
            self.partition
                .insert(SLOT_KEY, serde_json::to_vec(&rate)?)?;
            debug!("Seed PUT: {}", rate);
            Ok(())
        })();
        if let Err(e) = res {
            debug!("FjallSeedStore set error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_seed_store_get_set() {
        let dir = tempdir().unwrap();
        let store = FjallSeedStore::new(dir.path()).unwrap();

        // Initially, the slot is empty
        assert!(store.get().await.is_none());

        let rate = ExchangeRate::new("EUR", 47_868_000_000, "ticker.example.com");
        store.set(rate.clone()).await;

        assert_eq!(store.get().await, Some(rate));
    }

    #[tokio::test]
    async fn test_seed_store_holds_a_single_slot() {
        let dir = tempdir().unwrap();
        let store = FjallSeedStore::new(dir.path()).unwrap();

        store
            .set(ExchangeRate::new("EUR", 47_868_000_000, "a.example.com"))
            .await;
        store
            .set(ExchangeRate::new("USD", 51_230_000_000, "b.example.com"))
            .await;

        // Last write wins; earlier records are gone
        let current = store.get().await.unwrap();
        assert_eq!(current.currency_code, "USD");
        assert_eq!(current.source, "b.example.com");
    }
}
