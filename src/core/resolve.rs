//! Picks the single best rate for a requested currency code.

use crate::core::rate::{ExchangeRate, RateTable};
use std::env;

/// Last-resort currency tried when nothing else matches.
pub const DEFAULT_EXCHANGE_CURRENCY: &str = "USD";

/// Resolves `requested` against the table with a fixed precedence chain:
/// exact match, then the configured default, then the currency of the
/// process locale, then [`DEFAULT_EXCHANGE_CURRENCY`]. Returns `None` only
/// when the table contains none of the candidates.
pub fn resolve<'a>(
    table: &'a RateTable,
    requested: Option<&str>,
    configured_default: Option<&str>,
) -> Option<&'a ExchangeRate> {
    resolve_with_locale(
        table,
        requested,
        configured_default,
        locale_currency().as_deref(),
    )
}

pub fn resolve_with_locale<'a>(
    table: &'a RateTable,
    requested: Option<&str>,
    configured_default: Option<&str>,
    locale: Option<&str>,
) -> Option<&'a ExchangeRate> {
    for candidate in [requested, configured_default, locale]
        .into_iter()
        .flatten()
    {
        if let Some(rate) = table.get(candidate) {
            return Some(rate);
        }
    }
    table.get(DEFAULT_EXCHANGE_CURRENCY)
}

/// Currency of the process locale, from `LC_ALL`/`LC_MONETARY`/`LANG`
/// (e.g. `de_DE.UTF-8` -> `EUR`). `None` when unset or unrecognized.
pub fn locale_currency() -> Option<String> {
    ["LC_ALL", "LC_MONETARY", "LANG"]
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
        .and_then(|locale| region_currency(region_of(&locale)?))
        .map(str::to_string)
}

/// Extracts the territory from a POSIX locale string, `en_US.UTF-8` -> `US`.
fn region_of(locale: &str) -> Option<&str> {
    let tag = locale.split('.').next()?;
    let region = tag.split(['_', '-']).nth(1)?;
    (region.len() == 2 && region.bytes().all(|b| b.is_ascii_uppercase())).then_some(region)
}

fn region_currency(region: &str) -> Option<&'static str> {
    let currency = match region {
        "US" => "USD",
        "GB" => "GBP",
        "AT" | "BE" | "DE" | "ES" | "FI" | "FR" | "GR" | "IE" | "IT" | "NL" | "PT" => "EUR",
        "JP" => "JPY",
        "CN" => "CNY",
        "IN" => "INR",
        "AU" => "AUD",
        "CA" => "CAD",
        "CH" => "CHF",
        "SE" => "SEK",
        "NO" => "NOK",
        "DK" => "DKK",
        "PL" => "PLN",
        "CZ" => "CZK",
        "RU" => "RUB",
        "BR" => "BRL",
        "KR" => "KRW",
        "NZ" => "NZD",
        "SG" => "SGD",
        "HK" => "HKD",
        "MX" => "MXN",
        "ZA" => "ZAR",
        "TR" => "TRY",
        _ => return None,
    };
    Some(currency)
}
