//! Common types used across the application

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Current prices keyed by price-source id (e.g. `bitcoin`)
pub type PriceMap = HashMap<String, f64>;

/// Tracked coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: Uuid,
    pub code: String,
    pub name: Option<String>,
    /// Identifier understood by the external price API; coins without it are never priced
    pub price_source_id: Option<String>,
}

impl Coin {
    pub fn new(code: impl Into<String>, name: Option<String>, price_source_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name,
            price_source_id,
        }
    }

    pub fn is_active(&self) -> bool {
        self.price_source_id
            .as_deref()
            .map_or(false, |id| !id.trim().is_empty())
    }
}

/// Chat user receiving notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub chat_id: i64,
    pub display_name: Option<String>,
    pub is_privileged: bool,
}

impl Subscriber {
    pub fn new(chat_id: i64, display_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            display_name,
            is_privileged: false,
        }
    }
}

/// Alert thresholds of one subscription, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default)]
    pub min_rate: Option<f64>,
    #[serde(default)]
    pub max_rate: Option<f64>,
    #[serde(default)]
    pub growth_percent: Option<f64>,
    #[serde(default)]
    pub decline_percent: Option<f64>,
}

/// A subscriber's tracked coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub coin_id: Uuid,
    pub thresholds: Thresholds,
    /// Last observed price, the reference for growth/decline checks
    pub baseline_price: Option<f64>,
}

impl Subscription {
    pub fn new(subscriber_id: Uuid, coin_id: Uuid, thresholds: Thresholds) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscriber_id,
            coin_id,
            thresholds,
            baseline_price: None,
        }
    }
}
