use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::subscription::{CoinUpdate, Storage, SubscriptionUpdate};
use crate::shared::errors::{AppError, StorageError};
use crate::shared::types::{Coin, Subscriber, Subscription, Thresholds};

/// Fixture loaded into a fresh store
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub coins: Vec<SeedCoin>,
    pub subscribers: Vec<SeedSubscriber>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCoin {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price_source_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSubscriber {
    pub chat_id: i64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_privileged: bool,
    #[serde(default)]
    pub subscriptions: Vec<SeedSubscription>,
}

/// Subscription referencing its coin by code
#[derive(Debug, Clone, Deserialize)]
pub struct SeedSubscription {
    pub coin: String,
    #[serde(default)]
    pub min_rate: Option<f64>,
    #[serde(default)]
    pub max_rate: Option<f64>,
    #[serde(default)]
    pub growth_percent: Option<f64>,
    #[serde(default)]
    pub decline_percent: Option<f64>,
    #[serde(default)]
    pub baseline_price: Option<f64>,
}

impl SeedSubscription {
    fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_rate: self.min_rate,
            max_rate: self.max_rate,
            growth_percent: self.growth_percent,
            decline_percent: self.decline_percent,
        }
    }
}

impl SeedData {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("Failed to read seed file {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        toml::from_str(content).map_err(|e| AppError::ConfigError(format!("Failed to parse seed file: {}", e)))
    }
}

fn normalize_code(code: &str) -> Result<String, StorageError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(StorageError::InvalidCoin("coin code is empty".to_string()));
    }
    Ok(code)
}

#[derive(Debug, Default)]
struct StoreState {
    coins: HashMap<Uuid, Coin>,
    subscribers: HashMap<Uuid, Subscriber>,
    subscriptions: HashMap<Uuid, Subscription>,
}

impl StoreState {
    fn coin(&self, coin_id: Uuid) -> Result<&Coin, StorageError> {
        self.coins
            .get(&coin_id)
            .ok_or_else(|| StorageError::CoinNotFound(coin_id.to_string()))
    }

    fn subscriber(&self, subscriber_id: Uuid) -> Result<&Subscriber, StorageError> {
        self.subscribers
            .get(&subscriber_id)
            .ok_or_else(|| StorageError::SubscriberNotFound(subscriber_id.to_string()))
    }

    fn coin_by_code(&self, code: &str) -> Option<&Coin> {
        let code = code.trim().to_uppercase();
        self.coins.values().find(|coin| coin.code == code)
    }

    fn subscriber_by_chat(&self, chat_id: i64) -> Option<&Subscriber> {
        self.subscribers.values().find(|s| s.chat_id == chat_id)
    }

    fn subscription_for_pair(&self, subscriber_id: Uuid, coin_id: Uuid) -> Option<&Subscription> {
        self.subscriptions
            .values()
            .find(|s| s.subscriber_id == subscriber_id && s.coin_id == coin_id)
    }

    fn insert_coin(
        &mut self,
        code: &str,
        name: Option<String>,
        price_source_id: Option<String>,
    ) -> Result<Coin, StorageError> {
        let code = normalize_code(code)?;
        if self.coin_by_code(&code).is_some() {
            return Err(StorageError::DuplicateCoin(code));
        }
        let coin = Coin::new(code, name, price_source_id);
        self.coins.insert(coin.id, coin.clone());
        Ok(coin)
    }

    fn insert_subscriber(&mut self, chat_id: i64, display_name: Option<String>) -> Subscriber {
        if let Some(existing) = self.subscriber_by_chat(chat_id) {
            return existing.clone();
        }
        let subscriber = Subscriber::new(chat_id, display_name);
        self.subscribers.insert(subscriber.id, subscriber.clone());
        subscriber
    }

    fn insert_subscription(
        &mut self,
        subscriber_id: Uuid,
        coin_id: Uuid,
        thresholds: Thresholds,
    ) -> Result<Subscription, StorageError> {
        self.subscriber(subscriber_id)?;
        self.coin(coin_id)?;
        thresholds.validate()?;
        if self.subscription_for_pair(subscriber_id, coin_id).is_some() {
            return Err(StorageError::DuplicateSubscription {
                subscriber: subscriber_id,
                coin: coin_id,
            });
        }
        let subscription = Subscription::new(subscriber_id, coin_id, thresholds);
        self.subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }
}

/// In-process `Storage` backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding every coin, subscriber and subscription of `seed`
    pub fn from_seed(seed: &SeedData) -> Result<Self, StorageError> {
        let mut state = StoreState::default();

        for coin in &seed.coins {
            state.insert_coin(&coin.code, coin.name.clone(), coin.price_source_id.clone())?;
        }

        for entry in &seed.subscribers {
            let subscriber = state.insert_subscriber(entry.chat_id, entry.display_name.clone());
            if entry.is_privileged {
                if let Some(s) = state.subscribers.get_mut(&subscriber.id) {
                    s.is_privileged = true;
                }
            }

            for seeded in &entry.subscriptions {
                let coin_id = state
                    .coin_by_code(&seeded.coin)
                    .map(|coin| coin.id)
                    .ok_or_else(|| StorageError::CoinNotFound(seeded.coin.clone()))?;
                let subscription = state.insert_subscription(subscriber.id, coin_id, seeded.thresholds())?;
                if let Some(s) = state.subscriptions.get_mut(&subscription.id) {
                    s.baseline_price = seeded.baseline_price;
                }
            }
        }

        info!(
            "📦 Seeded store: {} coins, {} subscribers, {} subscriptions",
            state.coins.len(),
            state.subscribers.len(),
            state.subscriptions.len()
        );
        Ok(Self { state: RwLock::new(state) })
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn list_coins(&self) -> Result<Vec<Coin>, StorageError> {
        let state = self.state.read().await;
        let mut coins: Vec<Coin> = state.coins.values().cloned().collect();
        coins.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(coins)
    }

    async fn list_active_coins(&self) -> Result<Vec<Coin>, StorageError> {
        Ok(self.list_coins().await?.into_iter().filter(Coin::is_active).collect())
    }

    async fn coin_by_code(&self, code: &str) -> Result<Option<Coin>, StorageError> {
        Ok(self.state.read().await.coin_by_code(code).cloned())
    }

    async fn add_coin(
        &self,
        code: &str,
        name: Option<String>,
        price_source_id: Option<String>,
    ) -> Result<Coin, StorageError> {
        let coin = self.state.write().await.insert_coin(code, name, price_source_id)?;
        debug!("Added coin {}", coin.code);
        Ok(coin)
    }

    async fn update_coin(&self, coin_id: Uuid, update: CoinUpdate) -> Result<Coin, StorageError> {
        let mut state = self.state.write().await;
        let mut coin = state.coin(coin_id)?.clone();

        if let Some(code) = update.code {
            let code = normalize_code(&code)?;
            if state.coin_by_code(&code).map_or(false, |other| other.id != coin_id) {
                return Err(StorageError::DuplicateCoin(code));
            }
            coin.code = code;
        }
        update.name.apply(&mut coin.name);
        update.price_source_id.apply(&mut coin.price_source_id);

        state.coins.insert(coin_id, coin.clone());
        Ok(coin)
    }

    async fn delete_coin(&self, coin_id: Uuid) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let coin = state
            .coins
            .remove(&coin_id)
            .ok_or_else(|| StorageError::CoinNotFound(coin_id.to_string()))?;

        let before = state.subscriptions.len();
        state.subscriptions.retain(|_, s| s.coin_id != coin_id);
        info!("🗑️ Deleted coin {} with {} subscriptions", coin.code, before - state.subscriptions.len());
        Ok(())
    }

    async fn register_subscriber(
        &self,
        chat_id: i64,
        display_name: Option<String>,
    ) -> Result<Subscriber, StorageError> {
        Ok(self.state.write().await.insert_subscriber(chat_id, display_name))
    }

    async fn subscriber_by_chat(&self, chat_id: i64) -> Result<Option<Subscriber>, StorageError> {
        Ok(self.state.read().await.subscriber_by_chat(chat_id).cloned())
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StorageError> {
        let state = self.state.read().await;
        let mut subscribers: Vec<Subscriber> = state.subscribers.values().cloned().collect();
        subscribers.sort_by_key(|s| s.chat_id);
        Ok(subscribers)
    }

    async fn is_privileged(&self, chat_id: i64) -> Result<bool, StorageError> {
        Ok(self
            .state
            .read()
            .await
            .subscriber_by_chat(chat_id)
            .map_or(false, |s| s.is_privileged))
    }

    async fn subscriptions_for(&self, subscriber_id: Uuid) -> Result<Vec<(Coin, Subscription)>, StorageError> {
        let state = self.state.read().await;
        state.subscriber(subscriber_id)?;

        let mut joined: Vec<(Coin, Subscription)> = state
            .subscriptions
            .values()
            .filter(|s| s.subscriber_id == subscriber_id)
            .filter_map(|s| state.coins.get(&s.coin_id).map(|coin| (coin.clone(), s.clone())))
            .collect();
        joined.sort_by(|a, b| a.0.code.cmp(&b.0.code));
        Ok(joined)
    }

    async fn add_subscription(
        &self,
        subscriber_id: Uuid,
        coin_id: Uuid,
        thresholds: Thresholds,
    ) -> Result<Subscription, StorageError> {
        self.state
            .write()
            .await
            .insert_subscription(subscriber_id, coin_id, thresholds)
    }

    async fn update_subscription(
        &self,
        subscriber_id: Uuid,
        coin_id: Uuid,
        subscription_id: Uuid,
        update: SubscriptionUpdate,
    ) -> Result<Subscription, StorageError> {
        let mut state = self.state.write().await;
        let subscription = state
            .subscriptions
            .get_mut(&subscription_id)
            .filter(|s| s.subscriber_id == subscriber_id && s.coin_id == coin_id)
            .ok_or_else(|| StorageError::SubscriptionNotFound(subscription_id.to_string()))?;

        update.apply_to(subscription)?;
        Ok(subscription.clone())
    }

    async fn remove_subscription(&self, subscriber_id: Uuid, coin_id: Uuid) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let subscription_id = state
            .subscription_for_pair(subscriber_id, coin_id)
            .map(|s| s.id)
            .ok_or_else(|| {
                StorageError::SubscriptionNotFound(format!("subscriber {} / coin {}", subscriber_id, coin_id))
            })?;
        state.subscriptions.remove(&subscription_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::FieldUpdate;

    const SEED: &str = r#"
        [[coins]]
        code = "btc"
        name = "Bitcoin"
        price_source_id = "bitcoin"

        [[coins]]
        code = "ETH"
        price_source_id = "ethereum"

        [[coins]]
        code = "XYZ"

        [[subscribers]]
        chat_id = 42
        display_name = "alice"
        is_privileged = true

        [[subscribers.subscriptions]]
        coin = "BTC"
        min_rate = 60000.0
        baseline_price = 64000.0

        [[subscribers.subscriptions]]
        coin = "eth"
        growth_percent = 5.0

        [[subscribers]]
        chat_id = 7
    "#;

    fn seeded() -> MemoryStore {
        MemoryStore::from_seed(&SeedData::from_toml_str(SEED).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_seed_loads_everything() {
        let store = seeded();

        let coins = store.list_coins().await.unwrap();
        assert_eq!(coins.iter().map(|c| c.code.as_str()).collect::<Vec<_>>(), vec!["BTC", "ETH", "XYZ"]);

        let active = store.list_active_coins().await.unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|c| c.code != "XYZ"));

        assert!(store.is_privileged(42).await.unwrap());
        assert!(!store.is_privileged(7).await.unwrap());
        assert!(!store.is_privileged(1000).await.unwrap());

        let alice = store.subscriber_by_chat(42).await.unwrap().unwrap();
        let subs = store.subscriptions_for(alice.id).await.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].0.code, "BTC");
        assert_eq!(subs[0].1.baseline_price, Some(64000.0));
        assert_eq!(subs[1].1.thresholds.growth_percent, Some(5.0));
    }

    #[test]
    fn test_seed_with_unknown_coin_fails() {
        let seed = SeedData::from_toml_str(
            r#"
            [[subscribers]]
            chat_id = 1

            [[subscribers.subscriptions]]
            coin = "NOPE"
            "#,
        )
        .unwrap();
        assert_eq!(
            MemoryStore::from_seed(&seed).unwrap_err(),
            StorageError::CoinNotFound("NOPE".to_string())
        );
    }

    #[tokio::test]
    async fn test_coin_code_is_unique() {
        let store = MemoryStore::new();
        store.add_coin("BTC", None, Some("bitcoin".to_string())).await.unwrap();

        assert_eq!(
            store.add_coin(" btc ", None, None).await.unwrap_err(),
            StorageError::DuplicateCoin("BTC".to_string())
        );
        assert!(matches!(store.add_coin("  ", None, None).await, Err(StorageError::InvalidCoin(_))));
    }

    #[tokio::test]
    async fn test_update_coin_rejects_taken_code() {
        let store = seeded();
        let eth = store.coin_by_code("ETH").await.unwrap().unwrap();

        let err = store
            .update_coin(eth.id, CoinUpdate { code: Some("btc".to_string()), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::DuplicateCoin("BTC".to_string()));

        let updated = store
            .update_coin(
                eth.id,
                CoinUpdate {
                    name: FieldUpdate::Set("Ether".to_string()),
                    price_source_id: FieldUpdate::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ether"));
        assert!(!updated.is_active());
    }

    #[tokio::test]
    async fn test_delete_coin_cascades() {
        let store = seeded();
        let btc = store.coin_by_code("BTC").await.unwrap().unwrap();
        let alice = store.subscriber_by_chat(42).await.unwrap().unwrap();

        store.delete_coin(btc.id).await.unwrap();

        let subs = store.subscriptions_for(alice.id).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].0.code, "ETH");
        assert!(matches!(store.delete_coin(btc.id).await, Err(StorageError::CoinNotFound(_))));
    }

    #[tokio::test]
    async fn test_register_subscriber_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.register_subscriber(5, Some("bob".to_string())).await.unwrap();
        let second = store.register_subscriber(5, Some("robert".to_string())).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_subscribers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_one_subscription_per_coin() {
        let store = seeded();
        let alice = store.subscriber_by_chat(42).await.unwrap().unwrap();
        let btc = store.coin_by_code("BTC").await.unwrap().unwrap();

        let err = store
            .add_subscription(alice.id, btc.id, Thresholds::default())
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::DuplicateSubscription { subscriber: alice.id, coin: btc.id });
    }

    #[tokio::test]
    async fn test_add_subscription_validates_thresholds() {
        let store = seeded();
        let bob = store.subscriber_by_chat(7).await.unwrap().unwrap();
        let xyz = store.coin_by_code("XYZ").await.unwrap().unwrap();

        let invalid = Thresholds { min_rate: Some(10.0), max_rate: Some(5.0), ..Default::default() };
        assert!(matches!(
            store.add_subscription(bob.id, xyz.id, invalid).await,
            Err(StorageError::InvalidThresholds(_))
        ));
        assert!(store.subscriptions_for(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_subscription_checks_owner() {
        let store = seeded();
        let alice = store.subscriber_by_chat(42).await.unwrap().unwrap();
        let bob = store.subscriber_by_chat(7).await.unwrap().unwrap();
        let (btc, sub) = store.subscriptions_for(alice.id).await.unwrap().remove(0);

        let updated = store
            .update_subscription(alice.id, btc.id, sub.id, SubscriptionUpdate::baseline(65000.0))
            .await
            .unwrap();
        assert_eq!(updated.baseline_price, Some(65000.0));
        assert_eq!(updated.thresholds.min_rate, Some(60000.0));

        assert!(matches!(
            store
                .update_subscription(bob.id, btc.id, sub.id, SubscriptionUpdate::baseline(1.0))
                .await,
            Err(StorageError::SubscriptionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_subscription() {
        let store = seeded();
        let alice = store.subscriber_by_chat(42).await.unwrap().unwrap();
        let eth = store.coin_by_code("ETH").await.unwrap().unwrap();

        store.remove_subscription(alice.id, eth.id).await.unwrap();
        assert_eq!(store.subscriptions_for(alice.id).await.unwrap().len(), 1);
        assert!(matches!(
            store.remove_subscription(alice.id, eth.id).await,
            Err(StorageError::SubscriptionNotFound(_))
        ));
    }
}
