use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::shared::errors::AppError;

pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_IMAGE_URL: &str = "https://api.thecatapi.com/v1/images/search";
pub const DEFAULT_FALLBACK_IMAGE_URL: &str =
    "https://masterpiecer-images.s3.yandex.net/505cfa23621d11eea5826a0259d7362a:upscaled";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorCfg {
    pub update_interval_secs: u64,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self { update_interval_secs: 300 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpClientCfg {
    /// Total request timeout of every pooled session
    pub timeout_secs: u64,
    pub max_clients: usize,
    pub idle_timeout_secs: u64,
    pub sweep_period_secs: u64,
    pub acquire_backoff_ms: u64,
    /// Ignore HTTP(S)_PROXY from the environment
    pub no_proxy: bool,
}

impl Default for HttpClientCfg {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_clients: 5,
            idle_timeout_secs: 300,
            sweep_period_secs: 60,
            acquire_backoff_ms: 1000,
            no_proxy: false,
        }
    }
}

impl HttpClientCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_period_secs)
    }

    pub fn acquire_backoff(&self) -> Duration {
        Duration::from_millis(self.acquire_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriceApiCfg {
    pub base_url: String,
    pub vs_currency: String,
    pub api_key: Option<String>,
}

impl Default for PriceApiCfg {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PRICE_API_URL.to_string(),
            vs_currency: "usd".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageCfg {
    pub url: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub fallback_url: String,
}

impl Default for ImageCfg {
    fn default() -> Self {
        Self {
            url: DEFAULT_IMAGE_URL.to_string(),
            max_attempts: 3,
            retry_delay_ms: 1000,
            fallback_url: DEFAULT_FALLBACK_IMAGE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramCfg {
    pub api_url: String,
    pub bot_token: Option<String>,
}

impl Default for TelegramCfg {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            bot_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageCfg {
    /// TOML fixture with coins, subscribers and their subscriptions
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorCfg,
    pub http_client: HttpClientCfg,
    pub price_api: PriceApiCfg,
    pub image: ImageCfg,
    pub telegram: TelegramCfg,
    pub storage: StorageCfg,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.update_interval_secs)
    }

    /// Every interval, timeout and capacity must be positive
    pub fn validate(&self) -> Result<(), AppError> {
        let positive = [
            ("monitor.update_interval_secs", self.monitor.update_interval_secs),
            ("http_client.timeout_secs", self.http_client.timeout_secs),
            ("http_client.max_clients", self.http_client.max_clients as u64),
            ("http_client.idle_timeout_secs", self.http_client.idle_timeout_secs),
            ("http_client.sweep_period_secs", self.http_client.sweep_period_secs),
            ("http_client.acquire_backoff_ms", self.http_client.acquire_backoff_ms),
            ("image.max_attempts", self.image.max_attempts as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(AppError::ConfigError(format!("{} must be a positive integer", name)));
            }
        }
        if self.price_api.base_url.trim().is_empty() {
            return Err(AppError::ConfigError("price_api.base_url is empty".to_string()));
        }
        if self.price_api.vs_currency.trim().is_empty() {
            return Err(AppError::ConfigError("price_api.vs_currency is empty".to_string()));
        }
        Ok(())
    }
}
