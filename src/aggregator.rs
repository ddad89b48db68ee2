//! Owns the live rate table and orchestrates fallback across rate sources.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::rate::{RateRow, RateTable};
use crate::core::resolve;
use crate::providers::RateSource;
use crate::store::SeedStore;

/// Maximum age of the live table before a refresh is attempted.
const UPDATE_FREQ_MINUTES: i64 = 10;

struct State {
    table: Option<RateTable>,
    last_updated: Option<DateTime<Utc>>,
}

/// Aggregates exchange rates from a priority-ordered source list.
///
/// The table and its timestamp live behind one mutex, so a refresh is checked,
/// fetched and installed as a unit; concurrent readers see either the old
/// table or the fully-new one. On construction the seed slot is loaded so the
/// first query can answer before any network fetch succeeds.
pub struct RateAggregator {
    sources: Vec<Box<dyn RateSource>>,
    seed: Arc<dyn SeedStore>,
    ttl: TimeDelta,
    state: Mutex<State>,
}

impl RateAggregator {
    pub async fn new(sources: Vec<Box<dyn RateSource>>, seed: Arc<dyn SeedStore>) -> Self {
        let table = seed.get().await.map(|rate| {
            debug!("Seeding rate table from cached {}", rate);
            RateTable::from([(rate.currency_code.clone(), rate)])
        });

        Self {
            sources,
            seed,
            ttl: TimeDelta::minutes(UPDATE_FREQ_MINUTES),
            state: Mutex::new(State {
                table,
                last_updated: None,
            }),
        }
    }

    /// Overrides the refresh interval. Intended for tests.
    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// The query boundary: refreshes if stale, then returns rows.
    ///
    /// Without a filter, every known rate is returned in code order. With a
    /// filter, the resolver picks the single best row; `preferred` is the
    /// user's configured currency and doubles as the code cached back to the
    /// seed store after a successful refresh. An empty result means no rate
    /// data is available at all.
    pub async fn query(
        &self,
        now: DateTime<Utc>,
        filter: Option<&str>,
        preferred: Option<&str>,
    ) -> Vec<RateRow> {
        let mut state = self.state.lock().await;
        self.ensure_fresh(&mut state, now, preferred).await;

        let Some(table) = state.table.as_ref() else {
            return Vec::new();
        };

        match filter {
            None => table.values().map(RateRow::from).collect(),
            Some(code) => resolve::resolve(table, Some(code), preferred)
                .map(RateRow::from)
                .into_iter()
                .collect(),
        }
    }

    /// Snapshot of the live table after a staleness check, `None` until any
    /// fetch or seed load has produced one.
    pub async fn current_table(
        &self,
        now: DateTime<Utc>,
        preferred: Option<&str>,
    ) -> Option<RateTable> {
        let mut state = self.state.lock().await;
        self.ensure_fresh(&mut state, now, preferred).await;
        state.table.clone()
    }

    async fn ensure_fresh(&self, state: &mut State, now: DateTime<Utc>, preferred: Option<&str>) {
        let stale = state.last_updated.is_none_or(|at| now - at > self.ttl);
        if !stale {
            return;
        }

        // Total failure keeps whatever table we had, however old
        let Some(fresh) = self.refresh().await else {
            return;
        };

        if let Some(best) = resolve::resolve(&fresh, preferred, None) {
            self.seed.set(best.clone()).await;
        }

        state.table = Some(fresh);
        state.last_updated = Some(now);
    }

    async fn refresh(&self) -> Option<RateTable> {
        for source in &self.sources {
            match source.fetch_rates().await {
                Ok(table) if !table.is_empty() => {
                    info!("refreshed {} exchange rates via {}", table.len(), source.name());
                    return Some(table);
                }
                Ok(_) => warn!("empty rate table from {}", source.name()),
                Err(e) => warn!("problem fetching exchange rates from {}: {e:#}", source.name()),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::ExchangeRate;
    use crate::store::memory::MemorySeedStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a scripted sequence of fetch outcomes, then keeps failing.
    struct SequenceSource {
        name: &'static str,
        results: Mutex<VecDeque<Option<RateTable>>>,
        calls: Arc<AtomicUsize>,
    }

    impl SequenceSource {
        fn new(name: &'static str, results: Vec<Option<RateTable>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                name,
                results: Mutex::new(results.into()),
                calls: Arc::clone(&calls),
            };
            (source, calls)
        }
    }

    #[async_trait]
    impl RateSource for SequenceSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_rates(&self) -> anyhow::Result<RateTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.results.lock().await.pop_front() {
                Some(Some(table)) => Ok(table),
                _ => Err(anyhow!("fetch failed")),
            }
        }
    }

    fn table_from(source: &str, codes: &[&str]) -> RateTable {
        codes
            .iter()
            .map(|code| {
                (
                    code.to_string(),
                    ExchangeRate::new(code, 47_868_000_000, source),
                )
            })
            .collect()
    }

    fn always(name: &'static str, table: RateTable) -> (SequenceSource, Arc<AtomicUsize>) {
        // Large enough that no test runs the script dry
        SequenceSource::new(name, std::iter::repeat_n(Some(table), 16).collect())
    }

    fn failing(name: &'static str) -> (SequenceSource, Arc<AtomicUsize>) {
        SequenceSource::new(name, Vec::new())
    }

    #[tokio::test]
    async fn test_cold_start_with_no_sources_and_no_seed_yields_nothing() {
        let (primary, _) = failing("primary");
        let aggregator =
            RateAggregator::new(vec![Box::new(primary)], Arc::new(MemorySeedStore::new())).await;

        let rows = aggregator.query(Utc::now(), None, Some("EUR")).await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_secondary_source_wins_when_primary_fails() {
        let (primary, primary_calls) = failing("primary");
        let (secondary, _) = always("secondary", table_from("secondary", &["EUR", "GBP"]));
        let aggregator = RateAggregator::new(
            vec![Box::new(primary), Box::new(secondary)],
            Arc::new(MemorySeedStore::new()),
        )
        .await;

        let rows = aggregator.query(Utc::now(), None, Some("GBP")).await;

        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.source == "secondary"));
    }

    #[tokio::test]
    async fn test_table_is_reused_within_ttl() {
        let (source, calls) = always("primary", table_from("primary", &["EUR"]));
        let aggregator =
            RateAggregator::new(vec![Box::new(source)], Arc::new(MemorySeedStore::new())).await;

        let t0 = Utc::now();
        let first = aggregator.query(t0, None, Some("EUR")).await;
        let second = aggregator
            .query(t0 + TimeDelta::minutes(9), None, Some("EUR"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_refresh_attempted_after_ttl() {
        let (source, calls) = always("primary", table_from("primary", &["EUR"]));
        let aggregator =
            RateAggregator::new(vec![Box::new(source)], Arc::new(MemorySeedStore::new())).await;

        let t0 = Utc::now();
        aggregator.query(t0, None, Some("EUR")).await;
        aggregator
            .query(t0 + TimeDelta::minutes(11), None, Some("EUR"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_table_survives_total_source_failure() {
        let (source, calls) =
            SequenceSource::new("primary", vec![Some(table_from("primary", &["EUR"]))]);
        let aggregator =
            RateAggregator::new(vec![Box::new(source)], Arc::new(MemorySeedStore::new())).await;

        let t0 = Utc::now();
        let first = aggregator.query(t0, None, Some("EUR")).await;
        // Well past the TTL; the only source now fails every time
        let later = aggregator
            .query(t0 + TimeDelta::hours(2), None, Some("EUR"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first, later);
        assert_eq!(later[0].source, "primary");
    }

    #[tokio::test]
    async fn test_seed_record_bootstraps_the_table() {
        let seed = Arc::new(MemorySeedStore::new());
        seed.set(ExchangeRate::new("EUR", 47_868_000_000, "cached"))
            .await;

        let (source, _) = failing("primary");
        let aggregator = RateAggregator::new(vec![Box::new(source)], seed).await;

        let rows = aggregator.query(Utc::now(), None, Some("EUR")).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].currency_code, "EUR");
        assert_eq!(rows[0].source, "cached");
    }

    #[tokio::test]
    async fn test_successful_refresh_writes_preferred_rate_to_seed() {
        let seed = Arc::new(MemorySeedStore::new());
        let (source, _) = always("primary", table_from("primary", &["EUR", "GBP"]));
        let aggregator = RateAggregator::new(vec![Box::new(source)], seed.clone()).await;

        aggregator.query(Utc::now(), None, Some("GBP")).await;

        let cached = seed.get().await.unwrap();
        assert_eq!(cached.currency_code, "GBP");
        assert_eq!(cached.source, "primary");
    }

    #[tokio::test]
    async fn test_fresh_fetch_replaces_seeded_table_wholesale() {
        let seed = Arc::new(MemorySeedStore::new());
        seed.set(ExchangeRate::new("JPY", 1, "cached")).await;

        let (source, _) = always("primary", table_from("primary", &["EUR", "GBP"]));
        let aggregator = RateAggregator::new(vec![Box::new(source)], seed).await;

        let rows = aggregator.query(Utc::now(), None, Some("EUR")).await;
        let codes: Vec<_> = rows.iter().map(|r| r.currency_code.as_str()).collect();
        assert_eq!(codes, vec!["EUR", "GBP"]);
    }

    #[tokio::test]
    async fn test_filtered_query_resolves_single_row() {
        let (source, _) = always("primary", table_from("primary", &["EUR", "GBP"]));
        let aggregator =
            RateAggregator::new(vec![Box::new(source)], Arc::new(MemorySeedStore::new())).await;

        let now = Utc::now();
        // Exact match
        let rows = aggregator.query(now, Some("GBP"), Some("EUR")).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].currency_code, "GBP");

        // Unknown code falls back to the preferred currency
        let rows = aggregator.query(now, Some("ZZZ"), Some("EUR")).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].currency_code, "EUR");
    }

    #[tokio::test]
    async fn test_current_table_snapshot() {
        let (source, _) = always("primary", table_from("primary", &["EUR", "GBP"]));
        let aggregator =
            RateAggregator::new(vec![Box::new(source)], Arc::new(MemorySeedStore::new())).await;

        let table = aggregator
            .current_table(Utc::now(), Some("EUR"))
            .await
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["EUR"].source, "primary");

        let (down, _) = failing("primary");
        let empty =
            RateAggregator::new(vec![Box::new(down)], Arc::new(MemorySeedStore::new())).await;
        assert!(empty.current_table(Utc::now(), Some("EUR")).await.is_none());
    }

    #[tokio::test]
    async fn test_custom_ttl_is_honored() {
        let (source, calls) = always("primary", table_from("primary", &["EUR"]));
        let aggregator =
            RateAggregator::new(vec![Box::new(source)], Arc::new(MemorySeedStore::new()))
                .await
                .with_ttl(TimeDelta::seconds(1));

        let t0 = Utc::now();
        aggregator.query(t0, None, Some("EUR")).await;
        aggregator
            .query(t0 + TimeDelta::seconds(2), None, Some("EUR"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
