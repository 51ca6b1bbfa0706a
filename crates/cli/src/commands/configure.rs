use anyhow::{bail, Result};
use folio_types::config::{mask_secret, MetadataPolicy};
use folio_types::output::ConfigOutput;
use folio_utils::output::{render, OutputFormat};

/// `folio configure show`: display current config (non-interactive).
pub fn run(fmt: OutputFormat) -> Result<()> {
    let config = folio_core::workspace::load_config()?;
    let cg = &config.providers.coingecko;

    let output = ConfigOutput {
        config_path: folio_core::workspace::config_path()?.display().to_string(),
        default_address: config.system.default_address.clone(),
        mode: config.system.mode.to_string(),
        alchemy_key: config.alchemy_key().map(mask_secret),
        coingecko_key: config.coingecko_key().map(mask_secret),
        coingecko_tier: cg.tier.to_string(),
        metadata_budget_per_minute: cg.metadata_budget_per_minute,
        metadata_concurrency: cg.metadata_concurrency,
        metadata_policy: config.portfolio.metadata_policy.to_string(),
        rpc_min_gap_ms: config.providers.rpc.min_gap_ms,
        request_timeout_secs: config.providers.request_timeout_secs,
    };

    render(fmt, &output)?;

    if fmt == OutputFormat::Table {
        println!();
        println!("Tip: API keys can also come from ALCHEMY_API_KEY / COINGECKO_API_KEY or a .env file.");
    }

    Ok(())
}

/// `folio configure verbose <true|false>`
pub fn set_verbose(enabled: bool) -> Result<()> {
    let mut config = folio_core::workspace::load_saved_config()?;
    config.system.verbose = enabled;
    folio_core::workspace::save_config(&config)?;
    println!("✓ verbose = {enabled}");
    Ok(())
}

/// `folio configure address <ADDRESS>`
pub fn set_address(address: &str) -> Result<()> {
    let wallet = folio_core::wallet::watch_address(address)?;
    let mut config = folio_core::workspace::load_saved_config()?;
    config.system.default_address = Some(wallet.checksummed());
    folio_core::workspace::save_config(&config)?;
    println!("✓ Default address set to {}", wallet.checksummed());
    Ok(())
}

/// `folio configure policy <per-network|global-top-value> [--max-lookups N] [--min-value-usd X]`
pub fn set_policy(kind: &str, max_lookups: Option<usize>, min_value_usd: Option<f64>) -> Result<()> {
    let policy = parse_policy(kind, max_lookups, min_value_usd)?;
    let mut config = folio_core::workspace::load_saved_config()?;
    config.portfolio.metadata_policy = policy;
    folio_core::workspace::save_config(&config)?;
    println!("✓ Metadata policy: {}", config.portfolio.metadata_policy);
    Ok(())
}

fn parse_policy(kind: &str, max_lookups: Option<usize>, min_value_usd: Option<f64>) -> Result<MetadataPolicy> {
    match kind.to_lowercase().replace('_', "-").as_str() {
        "per-network" => Ok(MetadataPolicy::PerNetwork),
        "global-top-value" | "global" => Ok(match MetadataPolicy::global_top_value_default() {
            MetadataPolicy::GlobalTopValue { max_lookups: default_max, min_value_usd: default_min } => {
                MetadataPolicy::GlobalTopValue {
                    max_lookups: max_lookups.unwrap_or(default_max),
                    min_value_usd: min_value_usd.unwrap_or(default_min),
                }
            }
            other => other,
        }),
        other => bail!("Unknown policy: {other}. Use per-network or global-top-value"),
    }
}
