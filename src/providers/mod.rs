//! Rate source abstractions

pub mod ticker;

use crate::core::rate::RateTable;
use anyhow::Result;
use async_trait::async_trait;

/// One remote price endpoint. The aggregator walks a priority-ordered list of
/// these until one returns a usable table.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Identity recorded as the `source` of every rate this endpoint yields.
    fn name(&self) -> &str;

    async fn fetch_rates(&self) -> Result<RateTable>;
}
