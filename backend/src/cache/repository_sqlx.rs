use anyhow::{Context, ensure};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::cache::model::CachedPrice;
use crate::cache::repository::PriceRepository;

/// SQLx-backed implementation of PriceRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxPriceRepository {
    pool: SqlitePool,
}

impl SqlxPriceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceRepository for SqlxPriceRepository {
    #[instrument(skip(self, price), target = "store", fields(symbol = %price.symbol))]
    async fn upsert(&self, price: &CachedPrice) -> anyhow::Result<()> {
        ensure!(
            price.price_minor_units > 0,
            "refusing to cache non-positive price {} for {}",
            price.price_minor_units,
            price.symbol
        );

        sqlx::query(
            r#"
INSERT INTO gold_prices (symbol, name, price_rial, fetched_at)
VALUES (?, ?, ?, ?)
ON CONFLICT(symbol) DO UPDATE SET
  name = excluded.name,
  price_rial = excluded.price_rial,
  fetched_at = excluded.fetched_at;
"#,
        )
        .bind(&price.symbol)
        .bind(&price.name)
        .bind(price.price_minor_units)
        .bind(format_timestamp(&price.fetched_at))
        .execute(&self.pool)
        .await
        .context("gold_prices upsert failed")?;

        Ok(())
    }

    #[instrument(skip(self), target = "store")]
    async fn get(&self, symbol: &str) -> anyhow::Result<Option<CachedPrice>> {
        let row = sqlx::query(
            r#"
SELECT symbol, name, price_rial, fetched_at
FROM gold_prices
WHERE symbol = ?;
"#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .context("gold_prices lookup failed")?;

        row.as_ref().map(row_to_price).transpose()
    }
}

/* =========================
Row mapping + conversions
========================= */

fn row_to_price(r: &SqliteRow) -> anyhow::Result<CachedPrice> {
    let fetched_at: String = r.try_get("fetched_at")?;

    Ok(CachedPrice {
        symbol: r.try_get("symbol")?,
        name: r.try_get("name")?,
        price_minor_units: r.try_get("price_rial")?,
        fetched_at: parse_timestamp(&fetched_at)?,
    })
}

/// RFC3339, whole seconds, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid fetched_at timestamp {raw:?}"))?;
    Ok(ts.with_timezone(&Utc))
}
