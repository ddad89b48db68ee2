//! Exchange rate value types and the query-boundary row shape.

use crate::core::money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// One exchange rate: how many smallest base-currency units equal one unit of
/// `currency_code`. `source` names the endpoint host that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub currency_code: String,
    pub rate: i64,
    pub source: String,
}

impl ExchangeRate {
    pub fn new(currency_code: &str, rate: i64, source: &str) -> Self {
        Self {
            currency_code: currency_code.to_string(),
            rate,
            source: source.to_string(),
        }
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            self.currency_code,
            money::format_value(self.rate, money::MAX_PRECISION, 0)
        )
    }
}

/// The live rate table, keyed by currency code. A `BTreeMap` keeps
/// enumeration order deterministic. Tables are replaced wholesale on refresh,
/// never mutated in place.
pub type RateTable = BTreeMap<String, ExchangeRate>;

/// One row of the query boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRow {
    pub row_id: i64,
    pub currency_code: String,
    pub rate: i64,
    pub source: String,
}

impl From<&ExchangeRate> for RateRow {
    fn from(rate: &ExchangeRate) -> Self {
        Self {
            row_id: row_id(&rate.currency_code),
            currency_code: rate.currency_code.clone(),
            rate: rate.rate,
            source: rate.source.clone(),
        }
    }
}

/// Stable row identifier derived from the currency code alone, so a code maps
/// to the same id across refreshes and processes.
pub fn row_id(currency_code: &str) -> i64 {
    currency_code
        .bytes()
        .fold(0i64, |h, b| h.wrapping_mul(31).wrapping_add(i64::from(b)))
}
