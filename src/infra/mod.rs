//! Infrastructure layer implementations.

pub mod cache;
pub mod database;
pub mod explorer;
pub mod pricing;

pub use cache::{DEFAULT_CACHE_TTL, ReadThroughCache};
pub use database::{PostgresClient, PostgresConfig};
pub use explorer::{EmergentAgentClient, EtherscanClient};
pub use pricing::CoinGeckoPriceOracle;
