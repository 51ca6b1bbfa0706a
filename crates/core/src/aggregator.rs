//! Portfolio aggregator: fans balance discovery and enrichment out across
//! every network and assembles one [`PortfolioSnapshot`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use folio_common::constants::DEFAULT_METADATA_CONCURRENCY;
use folio_common::traits::{BalancesProvider, MarketDataProvider};
use folio_common::types::*;
use folio_types::config::MetadataPolicy;

use crate::budget::RateBudget;
use crate::enrich::enrich_network;

/// Produces a snapshot for an address. The store only knows this seam.
#[async_trait]
pub trait PortfolioFetcher: Send + Sync {
    async fn fetch(&self, address: &str) -> PortfolioSnapshot;
}

pub struct PortfolioAggregator {
    balances: Arc<dyn BalancesProvider>,
    market: Arc<dyn MarketDataProvider>,
    budget: Arc<RateBudget>,
    policy: MetadataPolicy,
    options: FetchOptions,
    metadata_concurrency: usize,
    networks: Vec<Network>,
}

impl PortfolioAggregator {
    pub fn new(
        balances: Arc<dyn BalancesProvider>,
        market: Arc<dyn MarketDataProvider>,
        budget: Arc<RateBudget>,
    ) -> Self {
        Self {
            balances,
            market,
            budget,
            policy: MetadataPolicy::default(),
            options: FetchOptions::default(),
            metadata_concurrency: DEFAULT_METADATA_CONCURRENCY,
            networks: Network::ALL.to_vec(),
        }
    }

    pub fn with_policy(mut self, policy: MetadataPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metadata_concurrency(mut self, concurrency: usize) -> Self {
        self.metadata_concurrency = concurrency;
        self
    }

    /// Restrict the load to a subset of networks. An empty list keeps all.
    pub fn with_networks(mut self, networks: Vec<Network>) -> Self {
        if !networks.is_empty() {
            self.networks = networks;
        }
        self
    }

    pub fn budget(&self) -> &Arc<RateBudget> {
        &self.budget
    }

    async fn discover(&self, address: &str) -> Vec<(Network, Vec<Holding>)> {
        join_all(self.networks.iter().copied().map(|network| async move {
            let holdings = match self.balances.holdings(address, network, self.options).await {
                Ok(h) => h,
                Err(e) => {
                    warn!(network = %network, provider = self.balances.name(), error = %e, "balance fetch failed");
                    Vec::new()
                }
            };
            (network, holdings)
        }))
        .await
    }
}

#[async_trait]
impl PortfolioFetcher for PortfolioAggregator {
    async fn fetch(&self, address: &str) -> PortfolioSnapshot {
        let address = address.trim();
        if address.is_empty() {
            return PortfolioSnapshot::default();
        }
        info!(address, networks = self.networks.len(), "portfolio load started");

        let discovered = self.discover(address).await;

        let allowed = match self.policy {
            MetadataPolicy::PerNetwork => None,
            MetadataPolicy::GlobalTopValue {
                max_lookups,
                min_value_usd,
            } => Some(top_by_value(&discovered, max_lookups, min_value_usd)),
        };

        let enriched = join_all(discovered.into_iter().map(|(network, holdings)| {
            let allowed = allowed.as_ref();
            async move {
                let out = enrich_network(
                    network,
                    holdings,
                    self.market.as_ref(),
                    &self.budget,
                    self.metadata_concurrency,
                    allowed,
                )
                .await;
                (network, out)
            }
        }))
        .await;

        let mut snapshot = PortfolioSnapshot::default();
        for (network, out) in enriched {
            snapshot.filtered_keys.extend(out.filtered_keys);
            snapshot.placeholders_used |= out.placeholders_used;
            snapshot.enriched_portfolio.insert(network, out.holdings);
        }

        info!(
            address,
            holdings = snapshot.enriched_portfolio.values().map(Vec::len).sum::<usize>(),
            filtered = snapshot.filtered_keys.len(),
            placeholders = snapshot.placeholders_used,
            "portfolio load finished"
        );
        snapshot
    }
}

/// Metadata candidates across every network, ranked by the value the
/// balances provider reported. Only the top `max_lookups` above
/// `min_value_usd` may spend a lookup.
fn top_by_value(
    discovered: &[(Network, Vec<Holding>)],
    max_lookups: usize,
    min_value_usd: f64,
) -> HashSet<String> {
    let mut ranked: Vec<(f64, String)> = discovered
        .iter()
        .flat_map(|(_, holdings)| holdings)
        .filter(|h| !h.is_native && !h.has_icon())
        .filter_map(|h| {
            let value = h.value_usd.filter(|v| *v > min_value_usd)?;
            Some((value, filtered_key(h.network, &h.contract_key()?)))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut allowed = HashSet::new();
    for (_, key) in ranked {
        if allowed.len() >= max_lookups {
            break;
        }
        allowed.insert(key);
    }
    allowed
}
