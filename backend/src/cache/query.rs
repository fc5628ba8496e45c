//! Read side of the price cache.
//!
//! Answers "what is the latest cached value" without ever touching the
//! network. Staleness is derived on every read from the stored timestamp and
//! the current time, so a value turns stale without any write happening.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use common::logger::warn_if_slow;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use crate::cache::model::CachedPrice;
use crate::cache::repository::PriceRepository;
use crate::cache::repository_sqlx::format_timestamp;

/// Wire shape of `GET /api/gold/18k`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceView {
    pub name: String,
    pub price: i64,
    pub fetched_at: String,
    pub stale: bool,
}

#[derive(Error, Debug)]
pub enum QueryError {
    /// No successful fetch has ever been stored.
    #[error("no cached price available")]
    NotYetAvailable,

    #[error("failed to read cached price")]
    Store(#[source] anyhow::Error),
}

#[derive(Clone)]
pub struct QueryService {
    repo: Arc<dyn PriceRepository>,
    symbol: String,
    stale_threshold: Duration,
}

impl QueryService {
    pub fn new(repo: Arc<dyn PriceRepository>, symbol: &str, stale_threshold: Duration) -> Self {
        Self {
            repo,
            symbol: symbol.to_string(),
            stale_threshold,
        }
    }

    pub async fn latest(&self) -> Result<PriceView, QueryError> {
        self.latest_at(Utc::now()).await
    }

    #[instrument(skip(self), target = "query", fields(symbol = %self.symbol))]
    pub async fn latest_at(&self, now: DateTime<Utc>) -> Result<PriceView, QueryError> {
        let row = warn_if_slow("db_get_price", Duration::from_millis(100), async {
            self.repo.get(&self.symbol).await
        })
        .await
        .map_err(QueryError::Store)?;

        let price = row.ok_or(QueryError::NotYetAvailable)?;
        Ok(self.view(price, now))
    }

    fn view(&self, price: CachedPrice, now: DateTime<Utc>) -> PriceView {
        PriceView {
            stale: is_stale(price.fetched_at, now, self.stale_threshold),
            fetched_at: format_timestamp(&price.fetched_at),
            name: price.name,
            price: price.price_minor_units,
        }
    }
}

/// `true` once strictly more than `threshold` has elapsed since `fetched_at`.
pub fn is_stale(fetched_at: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    let threshold = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
    now.signed_duration_since(fetched_at) > threshold
}
