//! Exact fixed-point money parsing and formatting.
//!
//! Amounts are carried as `i64` counts of the smallest unit (10^-8 of a
//! coin). No floating point is used on any path.

use anyhow::{Result, anyhow, bail};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

/// Smallest units per coin.
pub const COIN: i64 = 100_000_000;
/// Smallest units per milli-coin (the shift-3 display unit).
pub const MCOIN: i64 = 100_000;
/// Hard cap for any parsed amount, in smallest units.
pub const MAX_MONEY: i64 = 21_000_000 * COIN;
/// Fractional digits of the smallest unit.
pub const MAX_PRECISION: u32 = 8;

/// Parses a decimal string into smallest units, shifting the point right by
/// eight places. The conversion must be exact: a fractional remainder, a
/// negative amount, or anything above [`MAX_MONEY`] is an error.
pub fn parse_coin(text: &str) -> Result<i64> {
    let amount =
        Decimal::from_str(text).map_err(|e| anyhow!("invalid decimal amount '{text}': {e}"))?;
    let shifted = amount
        .checked_mul(Decimal::from(COIN))
        .ok_or_else(|| anyhow!("amount too large: {text}"))?;
    if !shifted.fract().is_zero() {
        bail!("amount is not a whole number of smallest units: {text}");
    }
    let units = shifted
        .trunc()
        .to_i64()
        .ok_or_else(|| anyhow!("amount too large: {text}"))?;
    if units < 0 {
        bail!("negative amount: {text}");
    }
    if units > MAX_MONEY {
        bail!("amount too large: {text}");
    }
    Ok(units)
}

/// Formats with an empty positive sign and a plain `-` negative sign.
pub fn format_value(value: i64, precision: u32, shift: u32) -> String {
    format_value_signed(value, "", "-", precision, shift)
}

/// Renders `value` (smallest units) as a decimal string.
///
/// `shift` 0 prints in coins, `shift` 3 in milli-coins. `precision` picks the
/// rounding bucket; the printed fraction uses the shortest width that still
/// represents the rounded value exactly. Unsupported precision/shift
/// combinations are programming errors and panic.
pub fn format_value_signed(
    value: i64,
    plus_sign: &str,
    minus_sign: &str,
    precision: u32,
    shift: u32,
) -> String {
    let sign = if value < 0 { minus_sign } else { plus_sign };

    if shift == 0 {
        let value = match precision {
            2 => value - value % 1_000_000 + value % 1_000_000 / 500_000 * 1_000_000,
            4 => value - value % 10_000 + value % 10_000 / 5_000 * 10_000,
            6 => value - value % 100 + value % 100 / 50 * 100,
            8 => value,
            _ => panic!("cannot handle precision/shift: {precision}/{shift}"),
        };

        let abs_value = value.abs();
        let coins = abs_value / COIN;
        let units = abs_value % COIN;

        if units % 1_000_000 == 0 {
            format!("{sign}{coins}.{:02}", units / 1_000_000)
        } else if units % 10_000 == 0 {
            format!("{sign}{coins}.{:04}", units / 10_000)
        } else if units % 100 == 0 {
            format!("{sign}{coins}.{:06}", units / 100)
        } else {
            format!("{sign}{coins}.{units:08}")
        }
    } else if shift == 3 {
        let value = match precision {
            2 => value - value % 1_000 + value % 1_000 / 500 * 1_000,
            4 => value - value % 10 + value % 10 / 5 * 10,
            5 => value,
            _ => panic!("cannot handle precision/shift: {precision}/{shift}"),
        };

        let abs_value = value.abs();
        let coins = abs_value / MCOIN;
        let units = abs_value % MCOIN;

        if units % 1_000 == 0 {
            format!("{sign}{coins}.{:02}", units / 1_000)
        } else if units % 10 == 0 {
            format!("{sign}{coins}.{:04}", units / 10)
        } else {
            format!("{sign}{coins}.{units:05}")
        }
    } else {
        panic!("cannot handle shift: {shift}");
    }
}
