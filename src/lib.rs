//! Pricewatch - crypto price alerts for chat subscribers
//! Built with Domain-Driven Design principles

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod shared;

// Re-export main types for convenience
pub use application::{AlertService, PriceMonitor};
pub use domain::price::{ConditionEvaluator, PriceFeed};
pub use infrastructure::http::ClientPool;
pub use shared::config::Config;
pub use shared::errors::AppError;
