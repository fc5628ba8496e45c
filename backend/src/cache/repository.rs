use anyhow::Result;
use async_trait::async_trait;

use crate::cache::model::CachedPrice;

#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Inserts the row for `price.symbol` or replaces every field of the
    /// existing one. Never partially applied.
    async fn upsert(&self, price: &CachedPrice) -> Result<()>;

    async fn get(&self, symbol: &str) -> Result<Option<CachedPrice>>;
}
