//! Provider traits: every data-source module implements one of these.
//!
//! This is the contract between the portfolio pipeline in `folio-core` and
//! the provider modules. Core never names a concrete provider; the CLI
//! factory wires them in, and tests substitute in-memory doubles.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::FolioResult;
use crate::types::*;

/// Holdings discovery for an address: Alchemy Data API and friends.
#[async_trait]
pub trait BalancesProvider: Send + Sync {
    /// Provider identifier, for logs.
    fn name(&self) -> &'static str;

    /// Normalized, non-zero holdings of `address` on one network.
    ///
    /// Implementations are best-effort: a failing request yields fewer (or
    /// no) holdings rather than an error. `Err` is reserved for failures
    /// that make the whole call meaningless, and callers still treat it as
    /// an empty list.
    async fn holdings(
        &self,
        address: &str,
        network: Network,
        opts: FetchOptions,
    ) -> FolioResult<Vec<Holding>>;
}

/// USD pricing and icon metadata: CoinGecko and friends.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Batch USD price + 24h change, keyed by lowercased contract address.
    /// Empty input and non-2xx responses both yield an empty map.
    async fn prices_for_contracts(
        &self,
        network: Network,
        addresses: &[String],
    ) -> FolioResult<HashMap<String, TokenPrice>>;

    /// USD price by provider coin id. Same short-circuit rules as above.
    async fn simple_prices_by_ids(
        &self,
        ids: &[String],
    ) -> FolioResult<HashMap<String, SimplePrice>>;

    /// Icon/id metadata for a single contract.
    async fn contract_metadata(
        &self,
        network: Network,
        address: &str,
    ) -> LookupOutcome<ContractMetadata>;

    /// Icon set for a coin id (native gas tokens).
    async fn coin_images(&self, coin_id: &str) -> FolioResult<CoinImages>;
}
