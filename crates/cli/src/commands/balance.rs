use anyhow::Result;
use folio_common::types::Network;
use folio_types::output::BalanceOutput;
use folio_utils::format::format_units;
use folio_utils::output::{render, OutputFormat};

use crate::factory;

/// `folio balance <ADDRESS> --network <N>`: one paced `eth_getBalance`.
pub async fn run(address: &str, network: &str, fmt: OutputFormat) -> Result<()> {
    let config = folio_core::workspace::load_config()?;
    let network: Network = network.parse()?;
    let wallet = folio_core::wallet::watch_address(address)?;

    let registry = factory::rpc_registry(&config)?;
    let client = registry.client(network)?;
    let raw = client.native_balance(&wallet.checksummed()).await?;
    let info = network.info();

    let output = BalanceOutput {
        address: wallet.checksummed(),
        network: network.to_string(),
        chain_id: info.chain_id,
        symbol: info.native_symbol.to_string(),
        balance: format_units(raw, info.native_decimals),
        balance_raw: raw.to_string(),
        rpc: client.source().as_str().to_string(),
    };
    render(fmt, &output)
}
