use anyhow::Result;
use folio_core::wallet::{self, DerivedWallet};
use folio_types::output::WalletOutput;
use folio_utils::output::{render, OutputFormat};
use tracing::info;

use super::helpers::read_secret;

/// `folio wallet derive --private-key | --mnemonic [--index N] [--save]`
///
/// `mnemonic_index` is `Some` for a mnemonic, `None` for a private key.
pub fn derive(mnemonic_index: Option<u32>, save: bool, fmt: OutputFormat) -> Result<()> {
    let derived = match mnemonic_index {
        Some(index) => wallet::from_mnemonic(&read_secret("mnemonic")?, index)?,
        None => wallet::from_private_key(&read_secret("private key")?)?,
    };
    finish(derived, save, fmt)
}

/// `folio wallet watch <ADDRESS> [--save]`
pub fn watch(address: &str, save: bool, fmt: OutputFormat) -> Result<()> {
    finish(wallet::watch_address(address)?, save, fmt)
}

fn finish(derived: DerivedWallet, save: bool, fmt: OutputFormat) -> Result<()> {
    if save {
        let mut config = folio_core::workspace::load_saved_config()?;
        config.system.default_address = Some(derived.checksummed());
        config.system.mode = derived.mode;
        folio_core::workspace::save_config(&config)?;
        info!(address = %derived.address, "default address saved");
    }

    let output = WalletOutput {
        address: derived.checksummed(),
        mode: derived.mode.to_string(),
        derivation_path: derived.derivation_path,
    };
    render(fmt, &output)
}
