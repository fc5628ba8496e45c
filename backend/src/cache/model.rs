use chrono::{DateTime, Utc};

use crate::market::types::PriceSample;

/// Storage key of the only cached instrument.
pub const GOLD_18K_SYMBOL: &str = "gold_18k";

/// The persisted "last known good" price for one symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedPrice {
    pub symbol: String,

    /// Display label, may be non-Latin script.
    pub name: String,

    /// Price in Rial (minor unit). Always positive.
    pub price_minor_units: i64,

    /// When the value was retrieved from upstream.
    pub fetched_at: DateTime<Utc>,
}

impl CachedPrice {
    pub fn from_sample(symbol: &str, sample: PriceSample) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: sample.name,
            price_minor_units: sample.price_minor_units,
            fetched_at: sample.fetched_at,
        }
    }
}
