pub mod aggregator;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;
pub use crate::core::rate::{ExchangeRate, RateRow, RateTable};

use crate::aggregator::RateAggregator;
use crate::core::config::AppConfig;
use crate::providers::RateSource;
use crate::providers::ticker::TickerSource;
use crate::store::disk::FjallSeedStore;
use crate::store::memory::MemorySeedStore;
use crate::store::SeedStore;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn http_user_agent() -> String {
    format!("coinrates/{}", env!("CARGO_PKG_VERSION"))
}

/// Builds the aggregator from config: one ticker source per configured
/// endpoint, in priority order, backed by the on-disk seed slot.
pub async fn build_aggregator(config: &AppConfig) -> Result<RateAggregator> {
    let user_agent = http_user_agent();

    let sources = config
        .sources
        .iter()
        .map(|source| {
            TickerSource::new(&source.base_url, &source.fields, &user_agent)
                .map(|ticker| Box::new(ticker) as Box<dyn RateSource>)
        })
        .collect::<Result<Vec<_>>>()?;

    let seed: Arc<dyn SeedStore> = match config
        .default_data_path()
        .and_then(|path| FjallSeedStore::new(&path))
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Could not open seed store, cached rates disabled: {e:#}");
            Arc::new(MemorySeedStore::new())
        }
    };

    Ok(RateAggregator::new(sources, seed).await)
}

pub async fn run(currency_filter: Option<&str>, config_path: Option<&str>) -> Result<()> {
    info!("Exchange rate tracker starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let aggregator = build_aggregator(&config).await?;
    let rows = aggregator
        .query(Utc::now(), currency_filter, Some(&config.currency))
        .await;

    cli::rates::display(&rows)
}
