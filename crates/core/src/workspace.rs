use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_types::config::{AppConfig, SystemConfig};
use tracing::info;

/// Dotfolder name under `$HOME`.
const DOTFOLDER: &str = ".folio";

const CONFIG_FILE: &str = "config.toml";

/// Resolve the root path: `$HOME/.folio/`.
pub fn root_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(DOTFOLDER))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(root_dir()?.join(CONFIG_FILE))
}

/// Ensure `$HOME/.folio/config.toml` exists, seeding defaults. Idempotent.
pub fn init_workspace() -> Result<()> {
    init_at(&root_dir()?)
}

/// Load the config from disk, then overlay `.env` and the process
/// environment (`ALCHEMY_API_KEY`, `COINGECKO_API_KEY`, `FOLIO_ADDRESS`).
pub fn load_config() -> Result<AppConfig> {
    let _ = dotenvy::dotenv();
    let mut config = load_from(&root_dir()?)?;
    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}

/// The file alone, without environment overrides. Use this when the
/// config is going to be saved back, so env-provided keys stay off disk.
pub fn load_saved_config() -> Result<AppConfig> {
    load_from(&root_dir()?)
}

/// Write the config back to disk.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_to(&root_dir()?, config)
}

fn init_at(root: &Path) -> Result<()> {
    if !root.exists() {
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create directory: {}", root.display()))?;
        info!("created directory: {}", root.display());
    }

    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        save_to(root, &AppConfig::default())?;
        info!("created default config: {}", config_path.display());
    }
    Ok(())
}

/// Read the file as-is. If it no longer matches the schema, regenerate it
/// from defaults while keeping the `[system]` table when that still parses.
fn load_from(root: &Path) -> Result<AppConfig> {
    let config_path = root.join(CONFIG_FILE);
    let raw = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    match AppConfig::from_toml_str(&raw) {
        Ok(config) => Ok(config),
        Err(e) => {
            info!(error = %e, "config.toml outdated, migrating to new schema");
            let mut migrated = AppConfig::default();

            if let Ok(old) = raw.parse::<toml::Table>() {
                if let Some(system) = old.get("system").cloned() {
                    if let Ok(system) = system.try_into::<SystemConfig>() {
                        migrated.system = system;
                    }
                }
            }

            save_to(root, &migrated)?;
            info!("config migrated successfully");
            Ok(migrated)
        }
    }
}

fn save_to(root: &Path, config: &AppConfig) -> Result<()> {
    let config_path = root.join(CONFIG_FILE);
    let toml_str = config
        .to_toml_string()
        .context("Failed to serialize config")?;
    fs::write(&config_path, &toml_str)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(())
}
