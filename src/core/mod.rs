pub mod config;
pub mod log;
pub mod money;
pub mod rate;
pub mod resolve;

pub use rate::{ExchangeRate, RateRow, RateTable};
