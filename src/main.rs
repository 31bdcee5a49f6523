use anyhow::Result;
use caseprice::cli::quote::parse_amount;
use caseprice::core::currency::Currency;
use caseprice::core::log::init_logging;
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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show how many case and key bundles an amount buys
    Quote {
        /// Amount of money, e.g. "100" or "1 250,50"
        #[arg(short, long, value_parser = parse_amount)]
        amount: f64,

        /// Currency of the amount
        #[arg(long, default_value = "USD")]
        currency: Currency,

        /// Case to quote, may be repeated (defaults to the first configured case)
        #[arg(long = "case")]
        cases: Vec<String>,
    },
    /// List configured cases with their current prices
    Cases,
}

impl From<Commands> for caseprice::AppCommand {
    fn from(cmd: Commands) -> caseprice::AppCommand {
        match cmd {
            Commands::Quote {
                amount,
                currency,
                cases,
            } => caseprice::AppCommand::Quote {
                amount,
                currency,
                cases,
            },
            Commands::Cases => caseprice::AppCommand::Cases,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => caseprice::cli::setup::setup_at_path(path),
            None => caseprice::cli::setup::setup(),
        },
        Some(cmd) => caseprice::run_command(cmd.into(), cli.config_path.as_deref())
            .await
            .map(|output| println!("{output}")),
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
