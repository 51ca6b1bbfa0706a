use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use folio_common::constants::{
    DEFAULT_METADATA_BUDGET_PER_MINUTE, DEFAULT_METADATA_CONCURRENCY, DEFAULT_RPC_MIN_GAP_MS,
};
use folio_common::types::{Network, WalletMode};

/// Top-level configuration stored in `$HOME/.folio/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Raise the default log filter to `debug`.
    #[serde(default)]
    pub verbose: bool,
    /// Address loaded when `folio portfolio` is run without one.
    #[serde(default)]
    pub default_address: Option<String>,
    #[serde(default)]
    pub mode: WalletMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Per-request HTTP timeout for every provider client.
    pub request_timeout_secs: u64,
    pub alchemy: AlchemyConfig,
    pub coingecko: CoinGeckoConfig,
    pub rpc: RpcConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            alchemy: AlchemyConfig::default(),
            coingecko: CoinGeckoConfig::default(),
            rpc: RpcConfig::default(),
        }
    }
}

// ─── Alchemy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlchemyConfig {
    pub api_key: Option<String>,
    /// Data API root; the key (when set) is appended as a path segment.
    pub data_api_url: String,
    pub with_metadata: bool,
    pub with_prices: bool,
    /// Retries on HTTP 429 before a page is given up.
    pub max_retries: u32,
}

impl Default for AlchemyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            data_api_url: "https://api.g.alchemy.com/data/v1".into(),
            with_metadata: true,
            with_prices: true,
            max_retries: 3,
        }
    }
}

// ─── CoinGecko ──────────────────────────────────────────────────────

/// API plan. Decides base URL and the query parameter carrying the key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinGeckoTier {
    #[default]
    Demo,
    Pro,
}

impl CoinGeckoTier {
    pub fn base_url(self) -> &'static str {
        match self {
            CoinGeckoTier::Demo => "https://api.coingecko.com/api/v3",
            CoinGeckoTier::Pro => "https://pro-api.coingecko.com/api/v3",
        }
    }

    pub fn key_param(self) -> &'static str {
        match self {
            CoinGeckoTier::Demo => "x_cg_demo_api_key",
            CoinGeckoTier::Pro => "x_cg_pro_api_key",
        }
    }
}

impl std::fmt::Display for CoinGeckoTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoinGeckoTier::Demo => write!(f, "demo"),
            CoinGeckoTier::Pro => write!(f, "pro"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub api_key: Option<String>,
    pub tier: CoinGeckoTier,
    /// Overrides the tier's base URL (tests, proxies).
    pub base_url: Option<String>,
    /// Contract metadata lookups allowed per rolling minute.
    pub metadata_budget_per_minute: u32,
    /// Parallel metadata lookups within one network.
    pub metadata_concurrency: usize,
    /// Minimum gap between request starts.
    pub min_spacing_ms: u64,
    pub max_concurrent: usize,
    pub retry: RetryConfig,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            tier: CoinGeckoTier::Demo,
            base_url: None,
            metadata_budget_per_minute: DEFAULT_METADATA_BUDGET_PER_MINUTE,
            metadata_concurrency: DEFAULT_METADATA_CONCURRENCY,
            min_spacing_ms: 80,
            max_concurrent: 4,
            retry: RetryConfig::default(),
        }
    }
}

impl CoinGeckoConfig {
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.tier.base_url())
    }
}

/// Backoff settings for HTTP 429 responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 4,
            base_delay_ms: 200,
            max_delay_ms: 3000,
            jitter_ratio: 0.3,
        }
    }
}

// ─── JSON-RPC ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Minimum gap between JSON-RPC call starts, across all networks.
    pub min_gap_ms: u64,
    /// Network name → endpoint, replacing the registry's public RPC.
    pub public_rpc_overrides: HashMap<String, String>,
}

impl RpcConfig {
    /// Configured endpoint for `network`, if any.
    pub fn override_for(&self, network: Network) -> Option<&str> {
        self.public_rpc_overrides
            .get(network.as_str())
            .map(String::as_str)
            .filter(|u| !u.is_empty())
    }

    pub fn public_rpc_for(&self, network: Network) -> &str {
        self.override_for(network).unwrap_or(network.info().public_rpc)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: DEFAULT_RPC_MIN_GAP_MS,
            public_rpc_overrides: HashMap::new(),
        }
    }
}

// ─── Portfolio ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    #[serde(default)]
    pub metadata_policy: MetadataPolicy,
}

/// Which ERC-20 holdings may spend a contract metadata lookup.
///
/// `per_network`: each network walks its own candidates against the shared
/// per-minute budget. `global_top_value`: candidates across every network
/// are ranked by USD value and only the top `max_lookups` above
/// `min_value_usd` are looked up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataPolicy {
    #[default]
    PerNetwork,
    GlobalTopValue {
        max_lookups: usize,
        min_value_usd: f64,
    },
}

impl MetadataPolicy {
    pub fn global_top_value_default() -> Self {
        MetadataPolicy::GlobalTopValue {
            max_lookups: DEFAULT_METADATA_BUDGET_PER_MINUTE as usize,
            min_value_usd: 1.0,
        }
    }
}

impl std::fmt::Display for MetadataPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataPolicy::PerNetwork => write!(f, "per_network"),
            MetadataPolicy::GlobalTopValue {
                max_lookups,
                min_value_usd,
            } => write!(f, "global_top_value (top {max_lookups} > ${min_value_usd})"),
        }
    }
}

// ─── Env overrides ──────────────────────────────────────────────────

pub const ENV_ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
pub const ENV_COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
pub const ENV_FOLIO_ADDRESS: &str = "FOLIO_ADDRESS";

impl AppConfig {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Overlay environment values on top of the file. Empty values are
    /// ignored so an exported-but-blank variable never wipes a saved key.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_ALCHEMY_API_KEY) {
            self.providers.alchemy.api_key = Some(key);
        }
        if let Some(key) = get(ENV_COINGECKO_API_KEY) {
            self.providers.coingecko.api_key = Some(key);
        }
        if let Some(addr) = get(ENV_FOLIO_ADDRESS) {
            self.system.default_address = Some(addr);
        }
    }

    pub fn alchemy_key(&self) -> Option<&str> {
        self.providers.alchemy.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn coingecko_key(&self) -> Option<&str> {
        self.providers.coingecko.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

/// `abcd…(32)`: first four characters and the length. Safe to log.
pub fn mask_secret(secret: &str) -> String {
    let head: String = secret.chars().take(4).collect();
    format!("{head}…({})", secret.chars().count())
}
