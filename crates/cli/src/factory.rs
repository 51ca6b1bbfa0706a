//! Pipeline factory: builds concrete providers and wires them into core.
//!
//! Lives in `cli` because `core` must NOT depend on provider modules; it
//! only sees the `folio-common` traits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use folio_common::types::Network;
use folio_core::{PortfolioAggregator, PortfolioStore, RateBudget, RpcRegistry};
use folio_mod_alchemy::AlchemyClient;
use folio_mod_coingecko::CoinGeckoClient;
use folio_types::config::AppConfig;

fn timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.providers.request_timeout_secs)
}

/// Aggregator over Alchemy balances and CoinGecko market data, limited to
/// `networks` (all when empty).
pub fn aggregator(config: &AppConfig, networks: Vec<Network>) -> Result<PortfolioAggregator> {
    let alchemy = AlchemyClient::new(&config.providers.alchemy, timeout(config))
        .context("Failed to build Alchemy client")?;
    let options = alchemy.default_options();
    let coingecko = CoinGeckoClient::new(&config.providers.coingecko, timeout(config))
        .context("Failed to build CoinGecko client")?;
    let budget = RateBudget::new(config.providers.coingecko.metadata_budget_per_minute);

    info!(
        policy = %config.portfolio.metadata_policy,
        budget = budget.per_minute(),
        "portfolio pipeline ready"
    );

    Ok(PortfolioAggregator::new(Arc::new(alchemy), Arc::new(coingecko), Arc::new(budget))
        .with_options(options)
        .with_policy(config.portfolio.metadata_policy.clone())
        .with_metadata_concurrency(config.providers.coingecko.metadata_concurrency)
        .with_networks(networks))
}

/// Store over [`aggregator`], seeded with the configured wallet mode.
pub fn portfolio_store(config: &AppConfig, networks: Vec<Network>) -> Result<PortfolioStore> {
    let store = PortfolioStore::new(Arc::new(aggregator(config, networks)?));
    store.set_mode(config.system.mode);
    Ok(store)
}

pub fn rpc_registry(config: &AppConfig) -> Result<RpcRegistry> {
    RpcRegistry::new(&config.providers).context("Failed to build RPC registry")
}
