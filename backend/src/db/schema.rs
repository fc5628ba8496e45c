use sqlx::SqlitePool;

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // One row per symbol; the poller overwrites it in place.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS gold_prices (
  symbol TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  price_rial INTEGER NOT NULL CHECK (price_rial > 0),
  fetched_at TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
