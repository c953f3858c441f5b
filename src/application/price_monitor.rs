use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::domain::notification::{ImageSource, Notification, Notifier};
use crate::domain::price::{ConditionEvaluator, PriceFeed};
use crate::domain::subscription::{Storage, SubscriptionUpdate};
use crate::shared::config::Config;
use crate::shared::errors::AppError;
use crate::shared::types::{PriceMap, Subscriber};

/// Конфигурация мониторинга цен
#[derive(Debug, Clone)]
pub struct PriceMonitorConfig {
    pub update_interval: Duration,
}

impl Default for PriceMonitorConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(300),
        }
    }
}

impl From<&Config> for PriceMonitorConfig {
    fn from(config: &Config) -> Self {
        Self {
            update_interval: config.update_interval(),
        }
    }
}

/// Итог одного прохода
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub subscribers: usize,
    pub prices_fetched: usize,
    pub notified: usize,
    pub failed: usize,
    pub baselines_refreshed: usize,
}

/// Статистика мониторинга
#[derive(Debug, Clone)]
pub struct MonitorStats {
    pub start_time: Instant,
    pub passes: u64,
    pub failed_passes: u64,
    pub notifications_sent: u64,
    pub subscriber_failures: u64,
    pub baselines_refreshed: u64,
    pub last_pass: Option<DateTime<Utc>>,
}

impl MonitorStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            passes: 0,
            failed_passes: 0,
            notifications_sent: 0,
            subscriber_failures: 0,
            baselines_refreshed: 0,
            last_pass: None,
        }
    }

    pub fn get_uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn record(&mut self, result: &Result<PassReport, AppError>) {
        self.passes += 1;
        self.last_pass = Some(Utc::now());
        match result {
            Ok(report) => {
                self.notifications_sent += report.notified as u64;
                self.subscriber_failures += report.failed as u64;
                self.baselines_refreshed += report.baselines_refreshed as u64;
            }
            Err(_) => self.failed_passes += 1,
        }
    }
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct SubscriberOutcome {
    notified: bool,
    baselines_refreshed: usize,
}

/// Периодическая проверка цен по подпискам
pub struct PriceMonitor {
    config: PriceMonitorConfig,
    storage: Arc<dyn Storage>,
    feed: Arc<dyn PriceFeed>,
    images: Arc<dyn ImageSource>,
    notifier: Arc<dyn Notifier>,
    stats: Arc<RwLock<MonitorStats>>,
}

impl PriceMonitor {
    pub fn new(
        config: PriceMonitorConfig,
        storage: Arc<dyn Storage>,
        feed: Arc<dyn PriceFeed>,
        images: Arc<dyn ImageSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            storage,
            feed,
            images,
            notifier,
            stats: Arc::new(RwLock::new(MonitorStats::new())),
        }
    }

    /// Проходы выполняются строго последовательно; остановка проверяется во время паузы
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "🚀 Запуск мониторинга цен (интервал {} сек)",
            self.config.update_interval.as_secs()
        );

        loop {
            let started = Instant::now();
            match self.run_pass().await {
                Ok(report) => info!(
                    "✅ Проход завершён за {:.1?}: подписчиков {}, цен {}, уведомлений {}, ошибок {}",
                    started.elapsed(),
                    report.subscribers,
                    report.prices_fetched,
                    report.notified,
                    report.failed
                ),
                Err(e) => error!("❌ Ошибка прохода мониторинга: {}", e),
            }

            tokio::select! {
                _ = sleep(self.config.update_interval) => {}
                _ = shutdown.recv() => {
                    info!("🛑 Остановка мониторинга цен...");
                    break;
                }
            }
        }

        self.print_monitor_stats().await;
    }

    /// One full pass; the result is also folded into the cumulative stats
    pub async fn run_pass(&self) -> Result<PassReport, AppError> {
        let result = self.execute_pass().await;
        self.stats.write().await.record(&result);
        result
    }

    async fn execute_pass(&self) -> Result<PassReport, AppError> {
        let subscribers = self.storage.list_subscribers().await?;
        let coins = self.storage.list_active_coins().await?;

        let ids: HashSet<String> = coins
            .iter()
            .filter_map(|coin| coin.price_source_id.clone())
            .collect();
        let prices = Arc::new(self.feed.get_prices(&ids).await?);

        let mut report = PassReport {
            subscribers: subscribers.len(),
            prices_fetched: prices.len(),
            ..Default::default()
        };
        if subscribers.is_empty() {
            debug!("No subscribers, skipping fan-out");
            return Ok(report);
        }

        let image_url = self.images.image_url().await;

        let mut tasks = JoinSet::new();
        for subscriber in subscribers {
            let storage = Arc::clone(&self.storage);
            let notifier = Arc::clone(&self.notifier);
            let prices = Arc::clone(&prices);
            let image_url = image_url.clone();
            tasks.spawn(async move {
                let chat_id = subscriber.chat_id;
                let outcome = process_subscriber(
                    storage.as_ref(),
                    notifier.as_ref(),
                    &subscriber,
                    &prices,
                    image_url,
                )
                .await;
                (chat_id, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => {
                    report.baselines_refreshed += outcome.baselines_refreshed;
                    if outcome.notified {
                        report.notified += 1;
                    }
                }
                Ok((chat_id, Err(e))) => {
                    report.failed += 1;
                    error!("❌ Ошибка обработки подписчика {}: {}", chat_id, e);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("❌ Задача подписчика завершилась аварийно: {}", e);
                }
            }
        }

        Ok(report)
    }

    /// Получить статистику мониторинга
    pub async fn get_stats(&self) -> MonitorStats {
        self.stats.read().await.clone()
    }

    async fn print_monitor_stats(&self) {
        let stats = self.stats.read().await;

        info!("📊 Статистика мониторинга:");
        info!("   Время работы: {:.1} мин", stats.get_uptime().as_secs_f64() / 60.0);
        info!("   Проходов: {}", stats.passes);
        if stats.failed_passes > 0 {
            warn!("   Неудачных проходов: {}", stats.failed_passes);
        }
        if stats.notifications_sent > 0 {
            info!("   Отправлено уведомлений: {}", stats.notifications_sent);
        }
        if stats.subscriber_failures > 0 {
            info!("   Ошибок по подписчикам: {}", stats.subscriber_failures);
        }
        if let Some(last) = stats.last_pass {
            info!("   Последний проход: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
}

/// Evaluate one subscriber's subscriptions, refresh every priced baseline and
/// send a single aggregated alert when anything fired
async fn process_subscriber(
    storage: &dyn Storage,
    notifier: &dyn Notifier,
    subscriber: &Subscriber,
    prices: &PriceMap,
    image_url: String,
) -> Result<SubscriberOutcome, AppError> {
    let mut outcome = SubscriberOutcome::default();
    let mut fired = Vec::new();

    for (coin, subscription) in storage.subscriptions_for(subscriber.id).await? {
        let Some(price) = coin
            .price_source_id
            .as_ref()
            .and_then(|id| prices.get(id))
            .copied()
        else {
            continue;
        };

        fired.extend(ConditionEvaluator::evaluate(&coin, &subscription, price));

        storage
            .update_subscription(subscriber.id, coin.id, subscription.id, SubscriptionUpdate::baseline(price))
            .await?;
        outcome.baselines_refreshed += 1;
    }

    if let Some(notification) = Notification::price_alert(subscriber.chat_id, &fired, Some(image_url)) {
        notifier.send(&notification).await?;
        outcome.notified = true;
        info!("📨 Уведомление отправлено в чат {} ({} условий)", subscriber.chat_id, fired.len());
    }

    Ok(outcome)
}
