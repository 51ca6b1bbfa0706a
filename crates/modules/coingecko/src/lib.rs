//! CoinGecko market-data provider.
//!
//! Batched USD prices by contract or coin id, per-contract metadata lookups
//! with 404 classification, and coin image sets for gas tokens.

pub mod client;

pub use client::CoinGeckoClient;
