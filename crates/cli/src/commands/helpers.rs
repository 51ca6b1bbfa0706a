//! Shared helpers for CLI commands.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use folio_common::types::Network;
use folio_types::config::AppConfig;

/// Parse `--network` values, rejecting unknown names. Empty means all.
pub fn parse_networks(raw: &[String]) -> Result<Vec<Network>> {
    let mut out = Vec::new();
    for name in raw {
        let network: Network = name.parse()?;
        if !out.contains(&network) {
            out.push(network);
        }
    }
    Ok(out)
}

/// Explicit argument first, then the configured default address.
pub fn resolve_address(arg: Option<String>, config: &AppConfig) -> Result<String> {
    arg.or_else(|| config.system.default_address.clone())
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .context("No address given. Pass one or set it with `folio configure address <ADDRESS>`")
}

/// Read one secret line from stdin. The prompt goes to stderr so JSON
/// output on stdout stays clean.
pub fn read_secret(label: &str) -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("{label}: ");
        io::stderr().flush()?;
    }
    let mut input = String::new();
    stdin
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    let secret = input.trim().to_string();
    if secret.is_empty() {
        bail!("No {label} provided");
    }
    Ok(secret)
}
