//! Outbound API clients built on the shared client pool

pub mod cat_image_client;
pub mod coingecko_client;
pub mod telegram_notifier;

pub use cat_image_client::CatImageClient;
pub use coingecko_client::CoinGeckoClient;
pub use telegram_notifier::{LogNotifier, TelegramNotifier};
