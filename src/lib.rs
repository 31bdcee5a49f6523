pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::currency::Currency;
use crate::providers::{CachePolicy, FrankfurterProvider, PriceCacheService, SteamMarketProvider};
use anyhow::Result;
use tracing::{debug, info};

pub type MarketPriceService = PriceCacheService<SteamMarketProvider, FrankfurterProvider>;

pub enum AppCommand {
    Quote {
        amount: f64,
        currency: Currency,
        cases: Vec<String>,
    },
    Cases,
}

pub fn build_service(config: &AppConfig) -> Result<MarketPriceService> {
    let prices = SteamMarketProvider::new(&config.providers.steam)?;
    let rates = FrankfurterProvider::new(&config.providers.frankfurter, config.base_currency)?;
    Ok(PriceCacheService::new(prices, rates, CachePolicy::from(&config.cache)))
}

/// Runs a command and returns the rendered report.
pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<String> {
    info!("Case price calculator starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let service = build_service(&config)?;

    match command {
        AppCommand::Quote {
            amount,
            currency,
            cases,
        } => {
            let cases = if cases.is_empty() {
                config.cases.iter().take(1).cloned().collect()
            } else {
                cases
            };
            if cases.is_empty() {
                anyhow::bail!("No case selected and the configured catalog is empty");
            }
            cli::quote::run(&service, &cases, amount, currency, config.key_price).await
        }
        AppCommand::Cases => cli::cases::run(&service, &config.cases).await,
    }
}
