//! Unified output rendering: JSON or human-readable table.
//!
//! Usage:
//! ```ignore
//! use folio_utils::output::{OutputFormat, render};
//!
//! let data = PortfolioOutput { ... };
//! render(format, &data)?;
//! ```

use anyhow::Result;
use serde::Serialize;

use folio_types::output::*;

use crate::format::{format_pct, format_usd, shorten_address};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default).
    Table,
    /// Compact JSON (for piping to jq, scripts).
    Json,
    /// Pretty-printed JSON (for reading).
    JsonPretty,
}

/// Trait for types that can render as a human-readable table.
pub trait TableDisplay {
    fn print_table(&self);
}

/// Render structured output, JSON or table depending on format.
pub fn render<T: Serialize + TableDisplay>(format: OutputFormat, data: &T) -> Result<()> {
    match format {
        OutputFormat::Table => {
            data.print_table();
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string(data)?;
            println!("{json}");
            Ok(())
        }
        OutputFormat::JsonPretty => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{json}");
            Ok(())
        }
    }
}

const DASH: &str = "—";

fn opt_usd(v: Option<f64>) -> String {
    v.map(format_usd).unwrap_or_else(|| DASH.to_string())
}

fn opt_pct(v: Option<f64>) -> String {
    v.map(format_pct).unwrap_or_else(|| DASH.to_string())
}

/// Token balances can be long; keep the column readable.
fn short_balance(balance: &str) -> String {
    match balance.split_once('.') {
        Some((int, frac)) if frac.len() > 6 => format!("{int}.{}", &frac[..6]),
        _ => balance.to_string(),
    }
}

fn print_holding_rows(rows: &[HoldingRow]) {
    println!("  {:<10} {:>20} {:>14} {:>9} {:>14}", "Token", "Balance", "Price", "24h", "Value");
    println!("  {}", "─".repeat(71));
    for r in rows {
        println!(
            "  {:<10} {:>20} {:>14} {:>9} {:>14}",
            r.symbol,
            short_balance(&r.balance),
            opt_usd(r.price_usd),
            opt_pct(r.change_24h_pct),
            opt_usd(r.value_usd),
        );
    }
}

impl TableDisplay for PortfolioOutput {
    fn print_table(&self) {
        println!("═══ Portfolio {} ═══", shorten_address(&self.address));
        println!("  Total value : {}", format_usd(self.total_value_usd));

        if self.placeholders_used {
            println!();
            println!("  ⚠ Some token icons or prices are placeholders (metadata rate limit).");
            println!("    Re-run in a minute to fill them in.");
        }

        let mut any = false;
        for net in &self.networks {
            if net.holdings.is_empty() {
                continue;
            }
            any = true;
            println!();
            println!("─── {} ({}) ───", net.display_name, format_usd(net.value_usd));
            print_holding_rows(&net.holdings);
        }
        if !any {
            println!();
            println!("  No holdings found.");
        }

        if !self.filtered.is_empty() {
            println!();
            println!(
                "─── Hidden: {} possibly scam/delisted token(s) ───",
                self.filtered.len()
            );
            for r in &self.filtered {
                println!(
                    "  {:<10} {:<10} {}",
                    r.symbol,
                    r.network,
                    r.contract.as_deref().map(shorten_address).unwrap_or_default()
                );
            }
        }
    }
}

impl TableDisplay for BalanceOutput {
    fn print_table(&self) {
        println!("═══ {} balance ═══", self.network);
        println!("  Address  : {}", self.address);
        println!("  Chain ID : {}", self.chain_id);
        println!("  Balance  : {} {}", self.balance, self.symbol);
        println!("  RPC      : {}", self.rpc);
    }
}

impl TableDisplay for WalletOutput {
    fn print_table(&self) {
        println!("✓ Address: {}", self.address);
        println!("  Mode   : {}", self.mode);
        if let Some(path) = &self.derivation_path {
            println!("  Path   : {path}");
        }
    }
}

impl TableDisplay for NetworksOutput {
    fn print_table(&self) {
        println!("┌───────────┬────────────┬──────────┬────────┬──────────────────────────────────┐");
        println!("│ Network   │ Name       │ Chain ID │ Native │ Explorer                         │");
        println!("├───────────┼────────────┼──────────┼────────┼──────────────────────────────────┤");
        for n in &self.networks {
            println!(
                "│ {:<9} │ {:<10} │ {:>8} │ {:<6} │ {:<32} │",
                n.network, n.display_name, n.chain_id, n.native_symbol, n.explorer,
            );
        }
        println!("└───────────┴────────────┴──────────┴────────┴──────────────────────────────────┘");
    }
}

impl TableDisplay for ConfigOutput {
    fn print_table(&self) {
        let unset = "(not set)";
        println!("═══ Folio configuration ═══");
        println!("  File            : {}", self.config_path);
        println!("  Default address : {}", self.default_address.as_deref().unwrap_or(unset));
        println!("  Mode            : {}", self.mode);
        println!("  Alchemy key     : {}", self.alchemy_key.as_deref().unwrap_or(unset));
        println!("  CoinGecko key   : {}", self.coingecko_key.as_deref().unwrap_or(unset));
        println!("  CoinGecko tier  : {}", self.coingecko_tier);
        println!("  Metadata budget : {}/min", self.metadata_budget_per_minute);
        println!("  Metadata conc.  : {}", self.metadata_concurrency);
        println!("  Metadata policy : {}", self.metadata_policy);
        println!("  RPC min gap     : {}ms", self.rpc_min_gap_ms);
        println!("  HTTP timeout    : {}s", self.request_timeout_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_balance_truncates_long_fraction() {
        assert_eq!(short_balance("1.123456789"), "1.123456");
        assert_eq!(short_balance("100.0"), "100.0");
        assert_eq!(short_balance("7"), "7");
    }

    #[test]
    fn test_missing_values_render_as_dash() {
        assert_eq!(opt_usd(None), DASH);
        assert_eq!(opt_pct(None), DASH);
        assert_eq!(opt_usd(Some(2.0)), "$2.00");
    }

    #[test]
    fn test_render_json_formats() {
        let data = WalletOutput {
            address: "0xabc".into(),
            mode: "watch".into(),
            derivation_path: None,
        };
        assert!(render(OutputFormat::Json, &data).is_ok());
        assert!(render(OutputFormat::JsonPretty, &data).is_ok());
        assert!(render(OutputFormat::Table, &data).is_ok());
    }
}
