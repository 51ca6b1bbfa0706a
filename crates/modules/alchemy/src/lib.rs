//! Alchemy balances provider.
//!
//! Discovers native and ERC-20 holdings through the Data API portfolio
//! endpoint and normalizes its response variants into `Holding`s.

pub mod client;
pub mod normalize;

pub use client::AlchemyClient;
