//! Application services - wiring of the alert pipeline

use std::sync::Arc;
use tracing::warn;

use crate::application::price_monitor::{PriceMonitor, PriceMonitorConfig};
use crate::domain::notification::{ImageSource, Notifier};
use crate::domain::price::PriceFeed;
use crate::domain::subscription::Storage;
use crate::infrastructure::api_clients::{CatImageClient, CoinGeckoClient, LogNotifier, TelegramNotifier};
use crate::infrastructure::http::{ClientPool, ClientPoolConfig};
use crate::infrastructure::storage::{MemoryStore, SeedData};
use crate::shared::config::Config;
use crate::shared::errors::AppError;

/// Owns the shared client pool and every collaborator built on it
pub struct AlertService {
    config: Config,
    pool: ClientPool,
    storage: Arc<dyn Storage>,
    feed: Arc<dyn PriceFeed>,
    images: Arc<dyn ImageSource>,
    notifier: Arc<dyn Notifier>,
}

impl AlertService {
    /// Build the pipeline; the pool's idle sweep is not running until `start`
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let pool = ClientPool::new(ClientPoolConfig::from(&config.http_client));

        let storage: Arc<dyn Storage> = match &config.storage.seed_file {
            Some(path) => Arc::new(MemoryStore::from_seed(&SeedData::from_file(path)?)?),
            None => {
                warn!("⚠️ Seed file is not configured, starting with an empty store");
                Arc::new(MemoryStore::new())
            }
        };

        let notifier: Arc<dyn Notifier> = match config.telegram.bot_token.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(token) => Arc::new(TelegramNotifier::new(pool.clone(), &config.telegram.api_url, token)),
            None => {
                warn!("⚠️ Bot token is not set, notifications go to the log only");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self {
            config: config.clone(),
            feed: Arc::new(CoinGeckoClient::new(pool.clone(), &config.price_api)),
            images: Arc::new(CatImageClient::new(pool.clone(), &config.image)),
            pool,
            storage,
            notifier,
        })
    }

    pub fn start(&self) {
        self.pool.start();
    }

    pub fn monitor(&self) -> PriceMonitor {
        PriceMonitor::new(
            PriceMonitorConfig::from(&self.config),
            Arc::clone(&self.storage),
            Arc::clone(&self.feed),
            Arc::clone(&self.images),
            Arc::clone(&self.notifier),
        )
    }

    pub fn feed(&self) -> Arc<dyn PriceFeed> {
        Arc::clone(&self.feed)
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }

    /// Stops the sweeper and drops every pooled client
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}
