//! Error handling for the application

use thiserror::Error;
use uuid::Uuid;

/// Client pool errors
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Client pool is shut down")]
    ShutDown,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Price-related errors
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("Price API transport error: {0}")]
    Transport(#[from] PoolError),

    #[error("Price API returned HTTP {0}")]
    Status(u16),

    #[error("Invalid price data: {0}")]
    InvalidPriceData(String),
}

/// Persistence errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Coin not found: {0}")]
    CoinNotFound(String),

    #[error("Subscriber not found: {0}")]
    SubscriberNotFound(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Coin code already exists: {0}")]
    DuplicateCoin(String),

    #[error("Subscriber {subscriber} already tracks coin {coin}")]
    DuplicateSubscription { subscriber: Uuid, coin: Uuid },

    #[error("Invalid coin: {0}")]
    InvalidCoin(String),

    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Notification dispatch errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification transport error: {0}")]
    Transport(#[from] PoolError),

    #[error("Chat API rejected message for {chat_id}: {reason}")]
    Rejected { chat_id: i64, reason: String },
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Price error: {0}")]
    Price(#[from] PriceError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Unknown(err.to_string())
    }
}
