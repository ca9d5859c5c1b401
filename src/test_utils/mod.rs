//! Test doubles shared by unit and integration tests.

pub mod mocks;

pub use mocks::{
    ExplorerFailure, MockConfig, MockDatabaseClient, MockExplorerClient, MockPriceOracle,
    sample_transactions,
};
