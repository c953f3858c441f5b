use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::domain::price::PriceFeed;
use crate::infrastructure::http::ClientPool;
use crate::shared::config::PriceApiCfg;
use crate::shared::errors::PriceError;
use crate::shared::types::PriceMap;

/// CoinGecko `simple/price` client over the shared client pool
pub struct CoinGeckoClient {
    pool: ClientPool,
    base_url: String,
    vs_currency: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(pool: ClientPool, cfg: &PriceApiCfg) -> Self {
        Self {
            pool,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            vs_currency: cfg.vs_currency.to_lowercase(),
            api_key: cfg.api_key.clone().filter(|key| !key.is_empty()),
        }
    }

    fn price_url(&self) -> String {
        format!("{}/simple/price", self.base_url)
    }
}

/// Pick `ids` out of a `{id: {currency: price}}` body.
/// Ids absent from the body, or without a numeric price, are skipped.
pub fn parse_prices(ids: &HashSet<String>, body: &Value, currency: &str) -> Result<PriceMap, PriceError> {
    let object = body
        .as_object()
        .ok_or_else(|| PriceError::InvalidPriceData(format!("expected a JSON object, got {}", body)))?;

    Ok(ids
        .iter()
        .filter_map(|id| {
            let price = object.get(id)?.get(currency)?.as_f64()?;
            Some((id.clone(), price))
        })
        .collect())
}

#[async_trait]
impl PriceFeed for CoinGeckoClient {
    async fn get_prices(&self, ids: &HashSet<String>) -> Result<PriceMap, PriceError> {
        if ids.is_empty() {
            return Ok(PriceMap::new());
        }

        let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let joined = sorted.join(",");

        let client = self.pool.acquire().await?;
        let mut request = client
            .get(&self.price_url())
            .query(&[("ids", joined.as_str()), ("vs_currencies", self.vs_currency.as_str())])
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        debug!("🔍 Fetching prices for {} ids", sorted.len());
        let response = client.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Price API returned HTTP {}", status);
            return Err(PriceError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PriceError::InvalidPriceData(e.to_string()))?;

        let prices = parse_prices(ids, &body, &self.vs_currency)?;
        if prices.len() < ids.len() {
            info!("Price API returned {}/{} requested ids", prices.len(), ids.len());
        }
        Ok(prices)
    }
}
