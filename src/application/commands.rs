//! CLI commands and handlers
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::application::services::AlertService;
use crate::shared::config::Config;
use crate::shared::errors::AppError;
use crate::shared::types::{Coin, PriceMap};
use crate::shared::utils::format_price;

#[derive(Parser, Debug)]
#[command(name = "pricewatch", version)]
#[command(about = "Crypto price alerts for chat subscribers")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seconds between monitoring passes (overrides config)
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Client pool capacity (overrides config)
    #[arg(long, global = true)]
    pub max_clients: Option<usize>,

    /// Telegram bot token
    #[arg(long, global = true, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Seed fixture with coins and subscribers (overrides config)
    #[arg(long, global = true)]
    pub seed: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Мониторинг цен до Ctrl+C
    Watch {
        /// Продолжительность работы в секундах
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Fetch current prices for price-source ids (e.g. bitcoin ethereum);
    /// without ids, every active coin in the store is priced
    Prices { ids: Vec<String> },

    /// Run a single monitoring pass and print its report
    Check,
}

impl Cli {
    /// File config (or defaults) with command-line overrides applied
    pub fn load_config(&self) -> Result<Config, AppError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(interval) = self.interval {
            config.monitor.update_interval_secs = interval;
        }
        if let Some(max_clients) = self.max_clients {
            config.http_client.max_clients = max_clients;
        }
        if let Some(token) = &self.bot_token {
            config.telegram.bot_token = Some(token.clone());
        }
        if let Some(seed) = &self.seed {
            config.storage.seed_file = Some(seed.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(command: Commands, config: Config) -> Result<(), AppError> {
        let service = AlertService::new(&config)?;
        service.start();

        let result = match command {
            Commands::Watch { duration } => {
                Self::execute_watch_command(&service, duration.map(Duration::from_secs)).await
            }
            Commands::Prices { ids } => Self::execute_prices_command(&service, ids).await,
            Commands::Check => Self::execute_check_command(&service).await,
        };

        service.shutdown().await;
        result
    }

    /// Execute watch command
    async fn execute_watch_command(service: &AlertService, duration: Option<Duration>) -> Result<(), AppError> {
        let monitor = Arc::new(service.monitor());
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let running = Arc::clone(&monitor);
        let handle = tokio::spawn(async move { running.run(shutdown_rx).await });

        match duration {
            Some(duration) => {
                info!("⏱️  Мониторинг будет работать {} секунд", duration.as_secs());
                tokio::select! {
                    _ = tokio::time::sleep(duration) => info!("✅ Время работы истекло"),
                    signal = tokio::signal::ctrl_c() => Self::on_ctrl_c(signal),
                }
            }
            None => Self::on_ctrl_c(tokio::signal::ctrl_c().await),
        }

        // receiver may already be gone if the monitor task panicked
        let _ = shutdown_tx.send(());
        handle.await?;
        Ok(())
    }

    fn on_ctrl_c(signal: std::io::Result<()>) {
        match signal {
            Ok(()) => info!("Ctrl+C received, shutting down"),
            Err(e) => warn!("Failed to listen for Ctrl+C ({}), shutting down", e),
        }
    }

    /// Execute prices command
    async fn execute_prices_command(service: &AlertService, ids: Vec<String>) -> Result<(), AppError> {
        let coins = if ids.is_empty() {
            service.storage().list_active_coins().await?
        } else {
            Vec::new()
        };
        let targets = price_targets(ids, &coins);
        if targets.is_empty() {
            warn!("⚠️ Нет активных монет для запроса цен");
            return Ok(());
        }

        let lookup: HashSet<String> = targets.iter().map(|(_, id)| id.clone()).collect();
        let prices = service.feed().get_prices(&lookup).await?;

        print!("{}", format_price_table(&targets, &prices));
        Ok(())
    }

    /// Execute check command
    async fn execute_check_command(service: &AlertService) -> Result<(), AppError> {
        let report = service.monitor().run_pass().await?;

        println!("Subscribers:         {}", report.subscribers);
        println!("Prices fetched:      {}", report.prices_fetched);
        println!("Notified:            {}", report.notified);
        println!("Failed subscribers:  {}", report.failed);
        println!("Baselines refreshed: {}", report.baselines_refreshed);
        Ok(())
    }
}

/// `(label, price-source id)` rows: explicit ids label themselves, stored coins go by code
fn price_targets(ids: Vec<String>, coins: &[Coin]) -> Vec<(String, String)> {
    let mut targets: Vec<(String, String)> = if ids.is_empty() {
        coins
            .iter()
            .filter(|coin| coin.is_active())
            .filter_map(|coin| {
                let id = coin.price_source_id.as_deref()?.trim().to_string();
                Some((coin.code.clone(), id))
            })
            .collect()
    } else {
        ids.into_iter()
            .map(|id| id.trim().to_lowercase())
            .collect::<HashSet<_>>()
            .into_iter()
            .map(|id| (id.clone(), id))
            .collect()
    };
    targets.sort();
    targets
}

fn format_price_table(targets: &[(String, String)], prices: &PriceMap) -> String {
    let mut table = format!("{:<24} {:>16}\n", "COIN", "PRICE");
    for (label, id) in targets {
        let price = prices.get(id).map(|p| format_price(*p)).unwrap_or_else(|| "n/a".to_string());
        table.push_str(&format!("{:<24} {:>16}\n", label, price));
    }
    table
}
