//! Structured output types for JSON/table rendering.
//!
//! Every data-producing command returns one of these types.
//! They all derive `Serialize` for JSON output, and implement
//! `TableDisplay` (in `folio-utils`) for human-readable tables.

use serde::Serialize;

// ─── Portfolio ──────────────────────────────────────────────────────

/// `folio portfolio` result.
///
/// ```json
/// {
///   "address": "0x...",
///   "total_value_usd": 1234.5,
///   "placeholders_used": false,
///   "networks": [{ "network": "mainnet", "holdings": [...] }],
///   "filtered": [{ "network": "base", "symbol": "SCAM", ... }]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioOutput {
    pub address: String,
    pub total_value_usd: f64,
    /// Some icons/prices are missing because metadata lookups were skipped.
    pub placeholders_used: bool,
    pub networks: Vec<NetworkHoldingsOutput>,
    /// Holdings the pricing provider does not know (possibly scam/delisted).
    pub filtered: Vec<HoldingRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkHoldingsOutput {
    pub network: String,
    pub display_name: String,
    pub value_usd: f64,
    pub holdings: Vec<HoldingRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingRow {
    pub network: String,
    pub symbol: String,
    pub name: Option<String>,
    /// Checksummed contract address, `None` for the gas token.
    pub contract: Option<String>,
    pub balance: String,
    pub price_usd: Option<f64>,
    pub change_24h_pct: Option<f64>,
    pub value_usd: Option<f64>,
    pub icon: Option<String>,
}

// ─── Balance ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BalanceOutput {
    pub address: String,
    pub network: String,
    pub chain_id: u64,
    pub symbol: String,
    pub balance: String,
    pub balance_raw: String,
    /// `alchemy` or `public`.
    pub rpc: String,
}

// ─── Wallet ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WalletOutput {
    pub address: String,
    /// `watch` or `full`.
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation_path: Option<String>,
}

// ─── Networks ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct NetworksOutput {
    pub networks: Vec<NetworkRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkRow {
    pub network: String,
    pub display_name: String,
    pub chain_id: u64,
    pub native_symbol: String,
    pub alchemy_slugs: Vec<String>,
    pub explorer: String,
}

// ─── Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ConfigOutput {
    pub config_path: String,
    pub default_address: Option<String>,
    pub mode: String,
    /// Masked, never the raw key.
    pub alchemy_key: Option<String>,
    pub coingecko_key: Option<String>,
    pub coingecko_tier: String,
    pub metadata_budget_per_minute: u32,
    pub metadata_concurrency: usize,
    pub metadata_policy: String,
    pub rpc_min_gap_ms: u64,
    pub request_timeout_secs: u64,
}
