//! Notification domain - outbound chat messages

use async_trait::async_trait;

use crate::domain::price::TriggeredCondition;
use crate::shared::errors::NotifyError;

pub const PRICE_ALERT_HEADER: &str = "Уведомление о изменении цены:";

/// Message addressed to one chat
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub chat_id: i64,
    pub text: String,
    pub image_url: Option<String>,
}

impl Notification {
    /// Aggregate every fired condition of one subscriber into a single message.
    /// Returns `None` when nothing fired.
    pub fn price_alert(
        chat_id: i64,
        conditions: &[TriggeredCondition],
        image_url: Option<String>,
    ) -> Option<Self> {
        if conditions.is_empty() {
            return None;
        }
        let lines: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
        Some(Self {
            chat_id,
            text: format!("{}\n{}", PRICE_ALERT_HEADER, lines.join("\n")),
            image_url,
        })
    }
}

/// Delivery of messages to an external chat
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Failures are reported per recipient
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Companion picture attached to alerts
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Always yields a usable URL, falling back to a fixed one on failure
    async fn image_url(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_alert_aggregates_conditions() {
        let conditions = vec![
            TriggeredCondition::FellToMin { code: "BTC".to_string(), price: 90.0, min_rate: 100.0 },
            TriggeredCondition::Declined { code: "ETH".to_string(), percent: 12.5, threshold: 10.0 },
        ];

        let alert = Notification::price_alert(42, &conditions, Some("https://img".to_string())).unwrap();
        assert_eq!(alert.chat_id, 42);
        assert_eq!(
            alert.text,
            "Уведомление о изменении цены:\n\
             Цена BTC упала до 90.00 (ниже 100.00)\n\
             Цена ETH упала на 12.50% (больше 10.00%)"
        );
        assert_eq!(alert.image_url.as_deref(), Some("https://img"));
    }

    #[test]
    fn test_no_conditions_no_alert() {
        assert!(Notification::price_alert(42, &[], None).is_none());
    }
}
