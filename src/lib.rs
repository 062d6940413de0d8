pub mod cli;
pub mod core;
pub mod providers;

use crate::core::auth::{self, Credentials};
use crate::core::config::AppConfig;
use crate::core::{HistoricalPeriod, PortfolioEngine};
use crate::providers::yahoo_finance::YahooFinanceProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Summary,
    Holdings,
    Allocation,
    Returns(HistoricalPeriod),
    Dashboard,
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    credentials: &Credentials,
) -> Result<()> {
    info!("Sharefolio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        users = config.users.len(),
        holdings = config.holdings.len(),
        "Loaded config"
    );

    let registry = Arc::new(config.registry()?);
    let session = auth::authenticate(&registry, &credentials.username, &credentials.password)?;

    let provider = Arc::new(YahooFinanceProvider::new(config.yahoo_base_url()));
    let engine = PortfolioEngine::new(registry, provider, config.pricing.policy());

    match command {
        AppCommand::Summary => cli::summary::run(&engine, &session, &config.currency).await,
        AppCommand::Holdings => cli::holdings::run(&engine, &session, &config.currency).await,
        AppCommand::Allocation => cli::alloc::run(&engine, &session, &config.currency).await,
        AppCommand::Returns(period) => cli::returns::run(&engine, period).await,
        AppCommand::Dashboard => cli::dashboard::run(&engine, &session, &config.currency).await,
    }
}
