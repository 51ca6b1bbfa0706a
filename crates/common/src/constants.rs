//! Universal constants for Folio: the static chain registry and provider defaults.

use crate::types::Network;

/// Static per-network facts. The pipeline treats this as a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainInfo {
    pub display_name: &'static str,
    pub native_symbol: &'static str,
    pub native_decimals: u8,
    pub chain_id: u64,
    /// CoinGecko asset platform id, for `/coins/{platform}/contract/{address}`.
    pub cg_platform_id: &'static str,
    /// CoinGecko coin id of the gas token, for `/simple/price`.
    pub native_cg_id: &'static str,
    /// Alchemy Data API slugs. Canonical first, historic aliases after.
    pub alchemy_slugs: &'static [&'static str],
    pub explorer_url: &'static str,
    pub public_rpc: &'static str,
    /// Alchemy JSON-RPC host prefix (`{prefix}.g.alchemy.com`).
    pub alchemy_rpc_prefix: &'static str,
    pub badge: &'static str,
}

pub const MAINNET: ChainInfo = ChainInfo {
    display_name: "Ethereum",
    native_symbol: "ETH",
    native_decimals: 18,
    chain_id: 1,
    cg_platform_id: "ethereum",
    native_cg_id: "ethereum",
    alchemy_slugs: &["eth-mainnet"],
    explorer_url: "https://etherscan.io",
    public_rpc: "https://cloudflare-eth.com",
    alchemy_rpc_prefix: "eth-mainnet",
    badge: "ethereum.png",
};

pub const POLYGON: ChainInfo = ChainInfo {
    display_name: "Polygon",
    native_symbol: "MATIC",
    native_decimals: 18,
    chain_id: 137,
    cg_platform_id: "polygon-pos",
    native_cg_id: "matic-network",
    alchemy_slugs: &["polygon-mainnet", "matic-mainnet"],
    explorer_url: "https://polygonscan.com",
    public_rpc: "https://polygon-rpc.com",
    alchemy_rpc_prefix: "polygon-mainnet",
    badge: "polygon.png",
};

pub const OPTIMISM: ChainInfo = ChainInfo {
    display_name: "Optimism",
    native_symbol: "ETH",
    native_decimals: 18,
    chain_id: 10,
    cg_platform_id: "optimistic-ethereum",
    native_cg_id: "ethereum",
    alchemy_slugs: &["opt-mainnet"],
    explorer_url: "https://optimistic.etherscan.io",
    public_rpc: "https://mainnet.optimism.io",
    alchemy_rpc_prefix: "opt-mainnet",
    badge: "optimism.png",
};

pub const ARBITRUM: ChainInfo = ChainInfo {
    display_name: "Arbitrum",
    native_symbol: "ETH",
    native_decimals: 18,
    chain_id: 42161,
    cg_platform_id: "arbitrum-one",
    native_cg_id: "ethereum",
    alchemy_slugs: &["arb-mainnet"],
    explorer_url: "https://arbiscan.io",
    public_rpc: "https://arb1.arbitrum.io/rpc",
    alchemy_rpc_prefix: "arb-mainnet",
    badge: "arbitrum.png",
};

pub const BASE: ChainInfo = ChainInfo {
    display_name: "Base",
    native_symbol: "ETH",
    native_decimals: 18,
    chain_id: 8453,
    cg_platform_id: "base",
    native_cg_id: "ethereum",
    alchemy_slugs: &["base-mainnet"],
    explorer_url: "https://basescan.org",
    public_rpc: "https://mainnet.base.org",
    alchemy_rpc_prefix: "base-mainnet",
    badge: "base.png",
};

/// CoinGecko free-tier limit for `/coins/{platform}/contract/{address}`.
pub const DEFAULT_METADATA_BUDGET_PER_MINUTE: u32 = 30;

/// Concurrency for per-network contract metadata lookups.
pub const DEFAULT_METADATA_CONCURRENCY: usize = 3;

/// Minimum gap between JSON-RPC call starts, across all networks.
pub const DEFAULT_RPC_MIN_GAP_MS: u64 = 250;

/// Block explorer link for a transaction hash.
pub fn explorer_tx_url(network: Network, hash: &str) -> String {
    format!("{}/tx/{}", network.info().explorer_url, hash)
}
