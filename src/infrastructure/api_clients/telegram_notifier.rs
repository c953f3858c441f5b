//! Telegram Bot API delivery

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::notification::{Notification, Notifier};
use crate::infrastructure::http::ClientPool;
use crate::shared::errors::NotifyError;

/// Telegram rejects photo captions longer than this
const MAX_CAPTION_CHARS: usize = 1024;

#[derive(Serialize)]
struct SendPhoto<'a> {
    chat_id: i64,
    photo: &'a str,
    caption: &'a str,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    pool: ClientPool,
    api_url: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(pool: ClientPool, api_url: &str, bot_token: &str) -> Self {
        Self {
            pool,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let chat_id = notification.chat_id;
        let client = self.pool.acquire().await?;

        let photo = notification
            .image_url
            .as_deref()
            .filter(|_| notification.text.chars().count() <= MAX_CAPTION_CHARS);
        let request = match photo {
            Some(photo) => client.post(&self.method_url("sendPhoto")).json(&SendPhoto {
                chat_id,
                photo,
                caption: &notification.text,
            }),
            None => client.post(&self.method_url("sendMessage")).json(&SendMessage {
                chat_id,
                text: &notification.text,
            }),
        };

        let response = client.send(request).await?;
        let status = response.status();
        let body: ApiResponse = response.json().await.map_err(|e| NotifyError::Rejected {
            chat_id,
            reason: format!("HTTP {}: {}", status, e),
        })?;

        if !body.ok {
            return Err(NotifyError::Rejected {
                chat_id,
                reason: body.description.unwrap_or_else(|| format!("HTTP {}", status)),
            });
        }

        debug!("Sent Telegram notification to {} (length={})", chat_id, notification.text.len());
        Ok(())
    }
}

/// Writes notifications to the log instead of a chat; used without a bot token
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            "📨 [chat {}] {}{}",
            notification.chat_id,
            notification.text.replace('\n', " | "),
            notification
                .image_url
                .as_deref()
                .map(|url| format!(" [{}]", url))
                .unwrap_or_default()
        );
        Ok(())
    }
}
