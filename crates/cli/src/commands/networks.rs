use anyhow::Result;
use folio_common::types::Network;
use folio_types::output::{NetworkRow, NetworksOutput};
use folio_utils::output::{render, OutputFormat};

/// `folio networks`
pub fn run(fmt: OutputFormat) -> Result<()> {
    let networks = Network::ALL
        .iter()
        .map(|n| {
            let info = n.info();
            NetworkRow {
                network: n.to_string(),
                display_name: info.display_name.to_string(),
                chain_id: info.chain_id,
                native_symbol: info.native_symbol.to_string(),
                alchemy_slugs: info.alchemy_slugs.iter().map(|s| s.to_string()).collect(),
                explorer: info.explorer_url.to_string(),
            }
        })
        .collect();
    render(fmt, &NetworksOutput { networks })
}
