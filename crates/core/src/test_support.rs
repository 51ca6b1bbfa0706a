//! In-memory providers shared by the pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::U256;
use async_trait::async_trait;

use folio_common::error::{FolioError, FolioResult};
use folio_common::traits::{BalancesProvider, MarketDataProvider};
use folio_common::types::*;

pub fn native(network: Network, formatted: &str) -> Holding {
    Holding {
        id: Holding::native_id(network),
        network,
        is_native: true,
        token: None,
        balance_raw: U256::from(1u64),
        balance_formatted: formatted.to_string(),
        price_usd: None,
        price_24h_change_pct: None,
        value_usd: None,
        image_thumb: None,
        image_small: None,
        image_large: None,
    }
}

pub fn token(network: Network, address: &str, formatted: &str, decimals: u8) -> Holding {
    Holding {
        id: Holding::token_id(network, address),
        network,
        is_native: false,
        token: Some(TokenInfo {
            address: address.to_string(),
            symbol: Some("TKN".into()),
            name: None,
            decimals: Some(decimals),
            logo_uri: None,
        }),
        balance_raw: U256::from(1u64),
        balance_formatted: formatted.to_string(),
        price_usd: None,
        price_24h_change_pct: None,
        value_usd: None,
        image_thumb: None,
        image_small: None,
        image_large: None,
    }
}

#[derive(Default)]
pub struct FakeMarket {
    pub contract_prices: HashMap<String, TokenPrice>,
    pub simple_prices: HashMap<String, SimplePrice>,
    /// Missing entries resolve to an empty `Found`.
    pub metadata: HashMap<String, LookupOutcome<ContractMetadata>>,
    pub coin_images: Option<CoinImages>,
    pub fail_prices: bool,
    pub metadata_calls: AtomicUsize,
    pub price_requests: Mutex<Vec<Vec<String>>>,
}

impl FakeMarket {
    pub fn with_contract_price(mut self, address: &str, usd: f64) -> Self {
        self.contract_prices.insert(
            address.to_lowercase(),
            TokenPrice {
                usd: Some(usd),
                ..TokenPrice::default()
            },
        );
        self
    }

    pub fn with_simple_price(mut self, id: &str, usd: f64) -> Self {
        self.simple_prices.insert(id.to_string(), SimplePrice { usd: Some(usd) });
        self
    }

    pub fn with_metadata(mut self, address: &str, outcome: LookupOutcome<ContractMetadata>) -> Self {
        self.metadata.insert(address.to_lowercase(), outcome);
        self
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    fn name(&self) -> &'static str {
        "fake-market"
    }

    async fn prices_for_contracts(
        &self,
        _network: Network,
        addresses: &[String],
    ) -> FolioResult<HashMap<String, TokenPrice>> {
        self.price_requests.lock().unwrap().push(addresses.to_vec());
        if self.fail_prices {
            return Err(FolioError::Network("connection reset".into()));
        }
        Ok(addresses
            .iter()
            .filter_map(|a| {
                let key = a.to_lowercase();
                self.contract_prices.get(&key).map(|p| (key, p.clone()))
            })
            .collect())
    }

    async fn simple_prices_by_ids(&self, ids: &[String]) -> FolioResult<HashMap<String, SimplePrice>> {
        if self.fail_prices {
            return Err(FolioError::Network("connection reset".into()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.simple_prices.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn contract_metadata(&self, _network: Network, address: &str) -> LookupOutcome<ContractMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .get(&address.to_lowercase())
            .cloned()
            .unwrap_or(LookupOutcome::Found(ContractMetadata::default()))
    }

    async fn coin_images(&self, coin_id: &str) -> FolioResult<CoinImages> {
        self.coin_images.clone().ok_or_else(|| FolioError::Http {
            status: 404,
            message: format!("/coins/{coin_id}"),
        })
    }
}

/// Balances keyed by address, then network.
#[derive(Default)]
pub struct FakeBalances {
    pub holdings: HashMap<String, BTreeMap<Network, Vec<Holding>>>,
    pub failing: HashSet<Network>,
    pub calls: AtomicUsize,
}

impl FakeBalances {
    pub fn with(mut self, address: &str, network: Network, holdings: Vec<Holding>) -> Self {
        self.holdings
            .entry(address.to_string())
            .or_default()
            .insert(network, holdings);
        self
    }
}

#[async_trait]
impl BalancesProvider for FakeBalances {
    fn name(&self) -> &'static str {
        "fake-balances"
    }

    async fn holdings(
        &self,
        address: &str,
        network: Network,
        _opts: FetchOptions,
    ) -> FolioResult<Vec<Holding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&network) {
            return Err(FolioError::Network("balances unavailable".into()));
        }
        Ok(self
            .holdings
            .get(address)
            .and_then(|by_network| by_network.get(&network))
            .cloned()
            .unwrap_or_default())
    }
}
