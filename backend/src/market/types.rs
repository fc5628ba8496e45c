use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::market::errors::FetchError;

/// One validated price observation, already converted to minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSample {
    pub name: String,
    pub price_minor_units: i64,
    pub fetched_at: DateTime<Utc>,
}

/// Source of fresh prices. Implementations perform exactly one bounded
/// upstream call per invocation.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<PriceSample, FetchError>;
}
