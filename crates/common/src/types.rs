//! Universal types shared across the pipeline and provider modules.
//!
//! Every provider converts its response shapes into these types. CLI and
//! store consumers only ever see these, never provider-specific structs.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::constants::{ChainInfo, ARBITRUM, BASE, MAINNET, OPTIMISM, POLYGON};
use crate::error::FolioError;

/// Supported EVM networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Polygon,
    Optimism,
    Arbitrum,
    Base,
}

impl Network {
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Polygon,
        Network::Optimism,
        Network::Arbitrum,
        Network::Base,
    ];

    pub fn info(self) -> &'static ChainInfo {
        match self {
            Network::Mainnet => &MAINNET,
            Network::Polygon => &POLYGON,
            Network::Optimism => &OPTIMISM,
            Network::Arbitrum => &ARBITRUM,
            Network::Base => &BASE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Polygon => "polygon",
            Network::Optimism => "optimism",
            Network::Arbitrum => "arbitrum",
            Network::Base => "base",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "ethereum" | "eth" => Ok(Network::Mainnet),
            "polygon" | "matic" => Ok(Network::Polygon),
            "optimism" | "op" => Ok(Network::Optimism),
            "arbitrum" | "arb" => Ok(Network::Arbitrum),
            "base" => Ok(Network::Base),
            other => Err(FolioError::Config(format!("unsupported network: {other}"))),
        }
    }
}

/// Whether the active address can sign (`full`) or is read-only (`watch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletMode {
    #[default]
    Watch,
    Full,
}

impl WalletMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WalletMode::Watch => "watch",
            WalletMode::Full => "full",
        }
    }
}

impl std::fmt::Display for WalletMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ERC-20 contract descriptor attached to a non-native holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Contract address as reported by the balances provider.
    pub address: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: Option<u8>,
    pub logo_uri: Option<String>,
}

impl TokenInfo {
    /// Lowercased address, the key used for every provider lookup.
    pub fn lookup_key(&self) -> String {
        self.address.to_lowercase()
    }

    /// EIP-55 checksummed address for display. Falls back to the raw string
    /// when the provider handed back something that is not a 20-byte address.
    pub fn display_address(&self) -> String {
        Address::from_str(&self.address)
            .map(|a| a.to_checksum(None))
            .unwrap_or_else(|_| self.address.clone())
    }
}

/// One balance position on one network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// `{network}:NATIVE` or `{network}:{lowercased contract}`.
    pub id: String,
    pub network: Network,
    pub is_native: bool,
    pub token: Option<TokenInfo>,
    #[serde(with = "u256_dec")]
    pub balance_raw: U256,
    pub balance_formatted: String,
    pub price_usd: Option<f64>,
    pub price_24h_change_pct: Option<f64>,
    pub value_usd: Option<f64>,
    pub image_thumb: Option<String>,
    pub image_small: Option<String>,
    pub image_large: Option<String>,
}

impl Holding {
    pub fn native_id(network: Network) -> String {
        format!("{network}:NATIVE")
    }

    pub fn token_id(network: Network, contract: &str) -> String {
        format!("{network}:{}", contract.to_lowercase())
    }

    /// Lowercased contract address, `None` for the native asset.
    pub fn contract_key(&self) -> Option<String> {
        self.token
            .as_ref()
            .filter(|t| !t.address.is_empty())
            .map(TokenInfo::lookup_key)
    }

    /// `balance_formatted` as a float, for USD arithmetic only.
    pub fn amount(&self) -> Option<f64> {
        self.balance_formatted.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// True if any icon source is already known for this holding.
    pub fn has_icon(&self) -> bool {
        [
            &self.image_large,
            &self.image_small,
            &self.image_thumb,
            &self.token.as_ref().and_then(|t| t.logo_uri.clone()),
        ]
        .iter()
        .any(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }

    pub fn symbol(&self) -> &str {
        if self.is_native {
            return self.network.info().native_symbol;
        }
        self.token
            .as_ref()
            .and_then(|t| t.symbol.as_deref())
            .unwrap_or("?")
    }
}

/// Network → holdings, in balances-provider order within each network.
pub type Portfolio = BTreeMap<Network, Vec<Holding>>;

/// Result of one full portfolio load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub enriched_portfolio: Portfolio,
    /// `{network}:{lowercased contract}` for contracts the pricing provider
    /// reported as unknown.
    pub filtered_keys: BTreeSet<String>,
    /// Some metadata lookup was skipped (budget) or failed transiently.
    pub placeholders_used: bool,
}

/// Composite key used in [`PortfolioSnapshot::filtered_keys`].
pub fn filtered_key(network: Network, contract: &str) -> String {
    format!("{network}:{}", contract.to_lowercase())
}

/// Balances-provider request toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub with_metadata: bool,
    pub with_prices: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            with_metadata: true,
            with_prices: true,
        }
    }
}

/// `/simple/token_price` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub usd: Option<f64>,
    pub usd_24h_change: Option<f64>,
    pub last_updated_at: Option<u64>,
}

/// `/simple/price` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimplePrice {
    pub usd: Option<f64>,
}

/// Contract metadata subset the pipeline consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub id: Option<String>,
    pub thumb: Option<String>,
    pub small: Option<String>,
}

/// Coin icon set from `/coins/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinImages {
    pub thumb: Option<String>,
    pub small: Option<String>,
    pub large: Option<String>,
}

/// Tagged outcome of a single metadata lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome<T> {
    Found(T),
    /// The provider affirmatively does not know the resource (HTTP 404).
    NotFound,
    /// Any other failure: non-2xx, transport error, exhausted retries.
    Transient(String),
}

/// Serialize `U256` as a decimal string so JSON consumers never lose precision.
mod u256_dec {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(d)?;
        U256::from_str_radix(&raw, 10).map_err(serde::de::Error::custom)
    }
}
