mod commands;
mod factory;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use folio_common::FolioError;
use folio_utils::output::OutputFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio: multi-chain EVM portfolio viewer.\nBalances across Ethereum, Polygon, Optimism, Arbitrum and Base, priced in USD.",
    version,
    propagate_version = true
)]
struct Cli {
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: CliOutputFormat,

    /// Debug logging for this run (same as `system.verbose`).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat { Table, Json, JsonPretty }

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> OutputFormat {
        match f {
            CliOutputFormat::Table => OutputFormat::Table,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregated, USD-priced holdings across every supported network.
    Portfolio {
        /// Address to load. Defaults to `system.default_address` / FOLIO_ADDRESS.
        address: Option<String>,
        /// Only load these networks (repeatable).
        #[arg(long, short = 'n')]
        network: Vec<String>,
        /// Ignore the cached snapshot.
        #[arg(long)]
        force: bool,
    },

    /// Native gas-token balance over JSON-RPC.
    Balance {
        address: String,
        #[arg(long, short = 'n', default_value = "mainnet")]
        network: String,
    },

    /// Derive or validate the address Folio operates on.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// List supported networks.
    Networks,

    /// Show or change configuration.
    Configure {
        #[command(subcommand)]
        action: ConfigureAction,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Derive an address from a secret read on stdin.
    Derive {
        /// Read a hex private key.
        #[arg(long, conflicts_with = "mnemonic", required_unless_present = "mnemonic")]
        private_key: bool,
        /// Read a BIP-39 mnemonic.
        #[arg(long)]
        mnemonic: bool,
        /// Account index for `m/44'/60'/0'/0/{index}`.
        #[arg(long, default_value_t = 0, requires = "mnemonic")]
        index: u32,
        /// Store the address as the default and switch to full mode.
        #[arg(long)]
        save: bool,
    },
    /// Validate a read-only address.
    Watch {
        address: String,
        /// Store the address as the default and switch to watch mode.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand)]
enum ConfigureAction {
    /// Show all current configuration (keys masked).
    Show,
    /// Toggle verbose logging.
    Verbose { enabled: bool },
    /// Set the default address.
    Address { address: String },
    /// Metadata lookup policy: `per-network` or `global-top-value`.
    Policy {
        kind: String,
        #[arg(long)]
        max_lookups: Option<usize>,
        #[arg(long)]
        min_value_usd: Option<f64>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let fmt: OutputFormat = cli.output.into();

    match cli.command {
        Commands::Portfolio { address, network, force } => {
            commands::portfolio::run(address, &network, force, fmt).await
        }
        Commands::Balance { address, network } => commands::balance::run(&address, &network, fmt).await,
        Commands::Wallet { action } => match action {
            WalletAction::Derive { private_key: _, mnemonic, index, save } => {
                commands::wallet::derive(mnemonic.then_some(index), save, fmt)
            }
            WalletAction::Watch { address, save } => commands::wallet::watch(&address, save, fmt),
        },
        Commands::Networks => commands::networks::run(fmt),
        Commands::Configure { action } => match action {
            ConfigureAction::Show => commands::configure::run(fmt),
            ConfigureAction::Verbose { enabled } => commands::configure::set_verbose(enabled),
            ConfigureAction::Address { address } => commands::configure::set_address(&address),
            ConfigureAction::Policy { kind, max_lookups, min_value_usd } => {
                commands::configure::set_policy(&kind, max_lookups, min_value_usd)
            }
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let setup = folio_core::init_workspace().and_then(|_| folio_core::workspace::load_config());
    let verbose = cli.verbose || setup.as_ref().is_ok_and(|c| c.system.verbose);
    init_tracing(verbose);

    let result = match setup {
        Ok(_) => run(cli).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        let code = e.downcast_ref::<FolioError>().map_or(1, FolioError::exit_code);
        std::process::exit(code);
    }
}
