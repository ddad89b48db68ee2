use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::core::money;
use crate::core::rate::{ExchangeRate, RateTable};
use crate::providers::RateSource;

/// Connect and read timeout for a single fetch attempt.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// A ticker endpoint serving one JSON object whose top-level keys are
/// currency codes. Each entry is probed with `fields` in priority order; the
/// first field holding a positive exact decimal wins.
pub struct TickerSource {
    endpoint: String,
    fields: Vec<String>,
    name: String,
    client: reqwest::Client,
}

impl TickerSource {
    pub fn new(endpoint: &str, fields: &[String], user_agent: &str) -> Result<Self> {
        let url = reqwest::Url::parse(endpoint)
            .with_context(|| format!("Invalid source endpoint: {endpoint}"))?;
        let name = url
            .host_str()
            .ok_or_else(|| anyhow!("Source endpoint has no host: {endpoint}"))?
            .to_string();

        // Redirects are not followed; a redirect status is a failed fetch.
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(HTTP_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            fields: fields.to_vec(),
            name,
            client,
        })
    }
}

/// Field values arrive as JSON strings or numbers depending on the endpoint.
fn field_text(entry: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    match entry.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl RateSource for TickerSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self) -> Result<RateTable> {
        let start = Instant::now();

        debug!("Requesting exchange rates from {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .with_context(|| format!("Request error for {}", self.endpoint))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            bail!("http status {status} when fetching {}", self.endpoint);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", self.endpoint))?;

        let head: Value = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse JSON response from {}", self.endpoint))?;
        let head = head
            .as_object()
            .ok_or_else(|| anyhow!("Expected a JSON object from {}", self.endpoint))?;

        let mut rates = RateTable::new();

        for (currency_code, entry) in head {
            if currency_code == "timestamp" {
                continue;
            }

            let entry = entry.as_object().ok_or_else(|| {
                anyhow!("Unexpected shape for {currency_code} from {}", self.endpoint)
            })?;

            for field in &self.fields {
                let Some(text) = field_text(entry, field) else {
                    continue;
                };
                match money::parse_coin(&text) {
                    Ok(rate) if rate > 0 => {
                        rates.insert(
                            currency_code.clone(),
                            ExchangeRate::new(currency_code, rate, &self.name),
                        );
                        break;
                    }
                    // Zero is unusable but not worth a log line
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            "problem parsing {currency_code} exchange rate from {}: {e}",
                            self.endpoint
                        );
                    }
                }
            }
        }

        if rates.is_empty() {
            bail!("no usable exchange rates in response from {}", self.endpoint);
        }

        info!(
            "fetched {} exchange rates from {}, took {} ms",
            rates.len(),
            self.endpoint,
            start.elapsed().as_millis()
        );

        Ok(rates)
    }
}
