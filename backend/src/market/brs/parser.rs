use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::market::brs::types::{BrsEnvelope, BrsItem};
use crate::market::errors::FetchError;
use crate::market::types::PriceSample;

pub const GOLD_18K_UPSTREAM_SYMBOL: &str = "IR_GOLD_18K";

/// Upstream quotes Toman; the cache stores Rial.
pub const MINOR_UNITS_PER_MAJOR: i64 = 10;

/// Used when upstream sends an empty label.
pub const FALLBACK_NAME: &str = "طلای 18 عیار";

/// Decodes a feed response and pulls out the 18k gold entry.
pub fn extract_gold_18k(body: &[u8], fetched_at: DateTime<Utc>) -> Result<PriceSample, FetchError> {
    let envelope: BrsEnvelope = serde_json::from_slice(body).map_err(FetchError::Format)?;

    let raw = envelope
        .gold
        .into_iter()
        .find(|item| item.get("symbol").and_then(Value::as_str) == Some(GOLD_18K_UPSTREAM_SYMBOL))
        .ok_or_else(|| {
            FetchError::Data(format!("{GOLD_18K_UPSTREAM_SYMBOL} not found in API response"))
        })?;

    let item: BrsItem = serde_json::from_value(raw).map_err(FetchError::Format)?;
    let price_minor_units = to_minor_units(item.price)?;

    let name = if item.name.trim().is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        item.name
    };

    Ok(PriceSample {
        name,
        price_minor_units,
        fetched_at,
    })
}

/// Converts a major-unit price to a positive integer count of minor units,
/// rounding to the nearest unit.
pub fn to_minor_units(price_major: f64) -> Result<i64, FetchError> {
    if !price_major.is_finite() || price_major <= 0.0 {
        return Err(FetchError::Data(format!(
            "{GOLD_18K_UPSTREAM_SYMBOL} has non-positive price {price_major}"
        )));
    }

    let minor = (price_major * MINOR_UNITS_PER_MAJOR as f64).round();
    if minor < 1.0 || minor >= i64::MAX as f64 {
        return Err(FetchError::Data(format!(
            "{GOLD_18K_UPSTREAM_SYMBOL} price {price_major} is out of range"
        )));
    }

    Ok(minor as i64)
}
