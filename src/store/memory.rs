use crate::core::rate::ExchangeRate;
use crate::store::SeedStore;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory seed slot, used in tests and when the data directory is
/// unavailable.
pub struct MemorySeedStore {
    slot: Mutex<Option<ExchangeRate>>,
}

impl MemorySeedStore {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl Default for MemorySeedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeedStore for MemorySeedStore {
    async fn get(&self) -> Option<ExchangeRate> {
        let slot = self.slot.lock().await;
        if slot.is_some() {
            debug!("Seed HIT");
        } else {
            debug!("Seed MISS");
        }
        slot.clone()
    }

    async fn set(&self, rate: ExchangeRate) {
        let mut slot = self.slot.lock().await;
        debug!("Seed PUT: {}", rate);
        *slot = Some(rate);
    }
}
