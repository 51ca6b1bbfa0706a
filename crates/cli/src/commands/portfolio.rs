use anyhow::Result;
use folio_common::types::{filtered_key, Holding, Network};
use folio_core::store::PortfolioState;
use folio_types::output::{HoldingRow, NetworkHoldingsOutput, PortfolioOutput};
use folio_utils::output::{render, OutputFormat};

use super::helpers::{parse_networks, resolve_address};
use crate::factory;

/// `folio portfolio [ADDRESS] [--network N]... [--force]`
pub async fn run(address: Option<String>, networks: &[String], force: bool, fmt: OutputFormat) -> Result<()> {
    let config = folio_core::workspace::load_config()?;
    let address = resolve_address(address, &config)?;
    folio_core::wallet::watch_address(&address)?;
    let networks = parse_networks(networks)?;

    let store = factory::portfolio_store(&config, networks)?;
    store.set_address(&address);
    store.load_portfolio(&address, force).await;

    render(fmt, &to_output(&address, &store.snapshot()))
}

fn is_filtered(h: &Holding, state: &PortfolioState) -> bool {
    h.contract_key()
        .is_some_and(|c| state.filtered_keys.contains(&filtered_key(h.network, &c)))
}

fn to_row(h: &Holding) -> HoldingRow {
    let token = h.token.as_ref();
    HoldingRow {
        network: h.network.to_string(),
        symbol: h.symbol().to_string(),
        name: token.and_then(|t| t.name.clone()),
        contract: token.map(|t| t.display_address()),
        balance: h.balance_formatted.clone(),
        price_usd: h.price_usd,
        change_24h_pct: h.price_24h_change_pct,
        value_usd: h.value_usd,
        icon: [&h.image_large, &h.image_small, &h.image_thumb]
            .into_iter()
            .flatten()
            .chain(token.and_then(|t| t.logo_uri.as_ref()))
            .find(|s| !s.is_empty())
            .cloned(),
    }
}

/// Visible holdings per network sorted by value (unpriced last); filtered
/// contracts go to their own bucket and are left out of the totals.
fn to_output(address: &str, state: &PortfolioState) -> PortfolioOutput {
    let mut networks = Vec::new();
    let mut filtered = Vec::new();

    for (network, holdings) in &state.enriched_portfolio {
        let mut rows = Vec::new();
        for h in holdings {
            if is_filtered(h, state) {
                filtered.push(to_row(h));
            } else {
                rows.push(to_row(h));
            }
        }
        rows.sort_by(|a, b| {
            b.value_usd
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.value_usd.unwrap_or(f64::NEG_INFINITY))
        });
        networks.push(NetworkHoldingsOutput {
            network: network.to_string(),
            display_name: Network::info(*network).display_name.to_string(),
            value_usd: rows.iter().filter_map(|r| r.value_usd).sum(),
            holdings: rows,
        });
    }

    PortfolioOutput {
        address: address.to_string(),
        total_value_usd: networks.iter().map(|n| n.value_usd).sum(),
        placeholders_used: state.placeholders_used,
        networks,
        filtered,
    }
}
