use anyhow::Result;
use assetflow::core::log::init_logging;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for assetflow::AppCommand {
    fn from(cmd: Commands) -> assetflow::AppCommand {
        match cmd {
            Commands::Summary => assetflow::AppCommand::Summary,
            Commands::Prices { refresh } => assetflow::AppCommand::Prices { refresh },
            Commands::Rates => assetflow::AppCommand::Rates,
            Commands::History { symbol, days } => assetflow::AppCommand::History { symbol, days },
            Commands::Backfill { days } => assetflow::AppCommand::Backfill { days },
            Commands::Serve => assetflow::AppCommand::Serve,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display portfolio value from cached prices
    Summary,
    /// Resolve prices for every held symbol
    Prices {
        /// Ignore cached prices and fetch everything
        #[arg(short, long)]
        refresh: bool,
    },
    /// Display official and P2P exchange rates
    Rates,
    /// Display recorded price history
    History {
        /// Only this symbol
        #[arg(short, long)]
        symbol: Option<String>,
        /// Number of days to show
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
    /// Fetch and store historical daily prices
    Backfill {
        /// Number of days to fetch
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
    /// Run the background refresh scheduler until interrupted
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => assetflow::cli::setup::setup_at_path(path),
            None => assetflow::cli::setup::setup(),
        },
        Some(cmd) => assetflow::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
