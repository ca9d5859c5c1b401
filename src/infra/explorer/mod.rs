//! Block-explorer client implementations.

pub mod emergent_agent;
pub mod etherscan;

pub use emergent_agent::{DEFAULT_EMERGENT_AGENT_URL, EmergentAgentClient};
pub use etherscan::{DEFAULT_ETHERSCAN_API_URL, EtherscanClient};
