//! Subscription domain - tracked coins, thresholds and their persistence

mod thresholds;

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::errors::StorageError;
use crate::shared::types::{Coin, Subscriber, Subscription, Thresholds};

/// Tri-state change of an optional field
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> FieldUpdate<T> {
    pub fn apply(self, field: &mut Option<T>) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Set(value) => *field = Some(value),
            FieldUpdate::Clear => *field = None,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}

/// Partial update of one subscription
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionUpdate {
    pub min_rate: FieldUpdate<f64>,
    pub max_rate: FieldUpdate<f64>,
    pub growth_percent: FieldUpdate<f64>,
    pub decline_percent: FieldUpdate<f64>,
    pub baseline_price: FieldUpdate<f64>,
}

impl SubscriptionUpdate {
    /// Refresh only the comparison baseline
    pub fn baseline(price: f64) -> Self {
        Self {
            baseline_price: FieldUpdate::Set(price),
            ..Default::default()
        }
    }

    pub fn touches_thresholds(&self) -> bool {
        !(self.min_rate.is_keep()
            && self.max_rate.is_keep()
            && self.growth_percent.is_keep()
            && self.decline_percent.is_keep())
    }

    /// Apply to a copy first so an invalid edit leaves the subscription untouched
    pub fn apply_to(&self, subscription: &mut Subscription) -> Result<(), StorageError> {
        let mut thresholds = subscription.thresholds.clone();
        self.min_rate.apply(&mut thresholds.min_rate);
        self.max_rate.apply(&mut thresholds.max_rate);
        self.growth_percent.apply(&mut thresholds.growth_percent);
        self.decline_percent.apply(&mut thresholds.decline_percent);
        if self.touches_thresholds() {
            thresholds.validate()?;
        }

        subscription.thresholds = thresholds;
        self.baseline_price.apply(&mut subscription.baseline_price);
        Ok(())
    }
}

/// Partial update of one coin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoinUpdate {
    pub code: Option<String>,
    pub name: FieldUpdate<String>,
    pub price_source_id: FieldUpdate<String>,
}

/// Persistence collaborator
#[async_trait]
pub trait Storage: Send + Sync {
    async fn list_coins(&self) -> Result<Vec<Coin>, StorageError>;

    /// Coins that carry a price-source id
    async fn list_active_coins(&self) -> Result<Vec<Coin>, StorageError>;

    async fn coin_by_code(&self, code: &str) -> Result<Option<Coin>, StorageError>;

    async fn add_coin(
        &self,
        code: &str,
        name: Option<String>,
        price_source_id: Option<String>,
    ) -> Result<Coin, StorageError>;

    async fn update_coin(&self, coin_id: Uuid, update: CoinUpdate) -> Result<Coin, StorageError>;

    /// Removes the coin together with every subscription to it
    async fn delete_coin(&self, coin_id: Uuid) -> Result<(), StorageError>;

    /// Create on first contact; returns the existing subscriber otherwise
    async fn register_subscriber(
        &self,
        chat_id: i64,
        display_name: Option<String>,
    ) -> Result<Subscriber, StorageError>;

    async fn subscriber_by_chat(&self, chat_id: i64) -> Result<Option<Subscriber>, StorageError>;

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StorageError>;

    async fn is_privileged(&self, chat_id: i64) -> Result<bool, StorageError>;

    /// Subscriptions of one subscriber joined with their coin
    async fn subscriptions_for(&self, subscriber_id: Uuid) -> Result<Vec<(Coin, Subscription)>, StorageError>;

    async fn add_subscription(
        &self,
        subscriber_id: Uuid,
        coin_id: Uuid,
        thresholds: Thresholds,
    ) -> Result<Subscription, StorageError>;

    async fn update_subscription(
        &self,
        subscriber_id: Uuid,
        coin_id: Uuid,
        subscription_id: Uuid,
        update: SubscriptionUpdate,
    ) -> Result<Subscription, StorageError>;

    async fn remove_subscription(&self, subscriber_id: Uuid, coin_id: Uuid) -> Result<(), StorageError>;
}
