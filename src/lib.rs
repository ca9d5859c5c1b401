//! HTTP gateway in front of a block explorer and a price oracle.
//!
//! Balances and transaction histories are served through a two-tier
//! read-through cache (in-process map over a PostgreSQL table). Balances are
//! valued in USD when a spot price is available. A separate receiver stores
//! HMAC-signed case-management webhooks.

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
