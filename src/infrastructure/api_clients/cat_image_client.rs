use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

use crate::domain::notification::ImageSource;
use crate::infrastructure::http::ClientPool;
use crate::shared::config::ImageCfg;

/// Один элемент ответа TheCatAPI
#[derive(Debug, Deserialize)]
struct CatImage {
    url: String,
}

/// Random cat picture for alert messages
pub struct CatImageClient {
    pool: ClientPool,
    url: String,
    max_attempts: u32,
    retry_delay: Duration,
    fallback_url: String,
}

impl CatImageClient {
    pub fn new(pool: ClientPool, cfg: &ImageCfg) -> Self {
        Self {
            pool,
            url: cfg.url.clone(),
            max_attempts: cfg.max_attempts.max(1),
            retry_delay: Duration::from_millis(cfg.retry_delay_ms),
            fallback_url: cfg.fallback_url.clone(),
        }
    }

    async fn fetch_once(&self) -> Result<String, String> {
        let client = self.pool.acquire().await.map_err(|e| e.to_string())?;
        let response = client.send(client.get(&self.url)).await.map_err(|e| e.to_string())?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(format!("Unexpected status code: {}", response.status()));
        }

        let images: Vec<CatImage> = response.json().await.map_err(|e| e.to_string())?;
        images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| "Empty image list".to_string())
    }
}

#[async_trait]
impl ImageSource for CatImageClient {
    async fn image_url(&self) -> String {
        for attempt in 1..=self.max_attempts {
            match self.fetch_once().await {
                Ok(url) => return url,
                Err(e) => {
                    error!("Image request error (attempt {}/{}): {}", attempt, self.max_attempts, e);
                    if attempt < self.max_attempts {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!("All attempts failed, using fallback image URL");
        self.fallback_url.clone()
    }
}
