pub mod disk;
pub mod memory;

use crate::core::rate::ExchangeRate;
use async_trait::async_trait;

/// Single-slot persistence for the last known good exchange rate.
///
/// The slot is read once at startup to seed the rate table before any fetch
/// succeeds, and overwritten after each successful refresh. Writes are
/// best-effort; a store that cannot persist must not fail the caller.
#[async_trait]
pub trait SeedStore: Send + Sync {
    async fn get(&self) -> Option<ExchangeRate>;
    async fn set(&self, rate: ExchangeRate);
}
