//! Wallet address derivation.
//!
//! The portfolio pipeline only ever needs an address. A private key or a
//! BIP-39 mnemonic yields a `full` wallet; a bare address is `watch`-only.
//! Secrets are used to derive the address and then dropped.

use std::str::FromStr;

use alloy::primitives::Address;
use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};
use tracing::info;

use folio_common::error::{FolioError, FolioResult};
use folio_common::types::WalletMode;

/// Standard Ethereum account path; `{index}` is the last component.
pub fn derivation_path(index: u32) -> String {
    format!("m/44'/60'/0'/0/{index}")
}

/// An address the app can operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedWallet {
    pub address: Address,
    pub mode: WalletMode,
    pub derivation_path: Option<String>,
}

impl DerivedWallet {
    /// EIP-55 checksummed address.
    pub fn checksummed(&self) -> String {
        self.address.to_checksum(None)
    }
}

pub fn from_private_key(raw_hex: &str) -> FolioResult<DerivedWallet> {
    let raw = raw_hex.trim();
    let hex_clean = raw.strip_prefix("0x").unwrap_or(raw);
    let signer: PrivateKeySigner = hex_clean
        .parse()
        .map_err(|_| FolioError::Wallet("invalid private key hex string".into()))?;

    let address = signer.address();
    info!(%address, "wallet derived from private key");
    Ok(DerivedWallet {
        address,
        mode: WalletMode::Full,
        derivation_path: None,
    })
}

pub fn from_mnemonic(phrase: &str, index: u32) -> FolioResult<DerivedWallet> {
    let words = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
    let path = derivation_path(index);
    let signer = MnemonicBuilder::<English>::default()
        .phrase(words)
        .derivation_path(path.as_str())
        .map_err(|e| FolioError::Wallet(format!("derivation path {path}: {e}")))?
        .build()
        .map_err(|e| FolioError::Wallet(format!("invalid mnemonic: {e}")))?;

    let address = signer.address();
    info!(%address, path = %path, "wallet derived from mnemonic");
    Ok(DerivedWallet {
        address,
        mode: WalletMode::Full,
        derivation_path: Some(path),
    })
}

/// Validate a 20-byte hex address for read-only use.
pub fn watch_address(raw: &str) -> FolioResult<DerivedWallet> {
    let address =
        Address::from_str(raw.trim()).map_err(|_| FolioError::InvalidAddress(raw.to_string()))?;
    Ok(DerivedWallet {
        address,
        mode: WalletMode::Watch,
        derivation_path: None,
    })
}
