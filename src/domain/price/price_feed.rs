//! Price feed interface

use async_trait::async_trait;
use std::collections::HashSet;

use crate::shared::errors::PriceError;
use crate::shared::types::PriceMap;

/// Batched price lookup by price-source id
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Ids missing from the upstream response are omitted from the result,
    /// they are not an error. Transport and status failures are.
    async fn get_prices(&self, ids: &HashSet<String>) -> Result<PriceMap, PriceError>;
}
