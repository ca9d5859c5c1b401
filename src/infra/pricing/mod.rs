//! Price oracle implementations.

pub mod coingecko;

pub use coingecko::{CoinGeckoPriceOracle, DEFAULT_COINGECKO_API_URL};
