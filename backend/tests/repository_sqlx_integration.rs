use chrono::{Duration as ChronoDuration, SubsecRound, Utc};
use sqlx::Row;
use tempfile::TempDir;

use gold_cache::cache::{CachedPrice, GOLD_18K_SYMBOL, PriceRepository, SqlxPriceRepository};
use gold_cache::db::Db;

/// Fresh on-disk database per test, so WAL and durability are exercised
/// exactly as in production.
async fn setup_db() -> (TempDir, String, Db) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("gold.db");
    let path = path.to_str().unwrap().to_string();

    let db = Db::connect(&path).await.unwrap();
    db.migrate().await.unwrap();

    (dir, path, db)
}

fn price(name: &str, rial: i64, minutes_ago: i64) -> CachedPrice {
    CachedPrice {
        symbol: GOLD_18K_SYMBOL.to_string(),
        name: name.to_string(),
        price_minor_units: rial,
        fetched_at: Utc::now().trunc_subsecs(0) - ChronoDuration::minutes(minutes_ago),
    }
}

#[tokio::test]
async fn get_on_empty_store_is_absent() {
    let (_dir, _path, db) = setup_db().await;
    let repo = SqlxPriceRepository::new(db.pool.clone());

    assert_eq!(repo.get(GOLD_18K_SYMBOL).await.unwrap(), None);
}

#[tokio::test]
async fn upsert_then_get_round_trip() {
    let (_dir, _path, db) = setup_db().await;
    let repo = SqlxPriceRepository::new(db.pool.clone());

    let p = price("طلای 18 عیار", 42_500_000, 0);
    repo.upsert(&p).await.unwrap();

    assert_eq!(repo.get(GOLD_18K_SYMBOL).await.unwrap(), Some(p));
}

#[tokio::test]
async fn upsert_replaces_every_field_in_place() {
    let (_dir, _path, db) = setup_db().await;
    let repo = SqlxPriceRepository::new(db.pool.clone());

    repo.upsert(&price("old", 1_000, 10)).await.unwrap();
    let newer = price("new", 2_000, 0);
    repo.upsert(&newer).await.unwrap();

    assert_eq!(repo.get(GOLD_18K_SYMBOL).await.unwrap(), Some(newer));

    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM gold_prices")
        .fetch_one(&db.pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn fetched_at_is_stored_as_rfc3339_utc_text() {
    let (_dir, _path, db) = setup_db().await;
    let repo = SqlxPriceRepository::new(db.pool.clone());

    let p = price("x", 5, 0);
    repo.upsert(&p).await.unwrap();

    let raw: String = sqlx::query("SELECT fetched_at FROM gold_prices WHERE symbol = ?")
        .bind(GOLD_18K_SYMBOL)
        .fetch_one(&db.pool)
        .await
        .unwrap()
        .get("fetched_at");

    assert!(raw.ends_with('Z'), "{raw}");
    assert_eq!(
        raw,
        p.fetched_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );
}

#[tokio::test]
async fn non_positive_prices_are_refused() {
    let (_dir, _path, db) = setup_db().await;
    let repo = SqlxPriceRepository::new(db.pool.clone());

    repo.upsert(&price("good", 10, 0)).await.unwrap();

    assert!(repo.upsert(&price("zero", 0, 0)).await.is_err());
    assert!(repo.upsert(&price("negative", -10, 0)).await.is_err());

    let kept = repo.get(GOLD_18K_SYMBOL).await.unwrap().unwrap();
    assert_eq!(kept.name, "good");
    assert_eq!(kept.price_minor_units, 10);
}

#[tokio::test]
async fn corrupt_timestamp_is_reported_not_defaulted() {
    let (_dir, _path, db) = setup_db().await;
    let repo = SqlxPriceRepository::new(db.pool.clone());

    sqlx::query("INSERT INTO gold_prices VALUES (?, 'x', 10, 'not-a-time')")
        .bind(GOLD_18K_SYMBOL)
        .execute(&db.pool)
        .await
        .unwrap();

    assert!(repo.get(GOLD_18K_SYMBOL).await.is_err());
}

#[tokio::test]
async fn value_survives_reopening_the_file() {
    let (_dir, path, db) = setup_db().await;

    let p = price("persisted", 77_000, 3);
    SqlxPriceRepository::new(db.pool.clone())
        .upsert(&p)
        .await
        .unwrap();
    db.close().await;

    let reopened = Db::connect(&path).await.unwrap();
    reopened.migrate().await.unwrap();

    let got = SqlxPriceRepository::new(reopened.pool.clone())
        .get(GOLD_18K_SYMBOL)
        .await
        .unwrap();
    assert_eq!(got, Some(p));
}

#[tokio::test]
async fn store_runs_in_wal_mode() {
    let (_dir, _path, db) = setup_db().await;

    let mode: String = sqlx::query("PRAGMA journal_mode")
        .fetch_one(&db.pool)
        .await
        .unwrap()
        .get(0);

    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let (_dir, _path, db) = setup_db().await;
    let repo = SqlxPriceRepository::new(db.pool.clone());
    repo.upsert(&price("x", 10, 0)).await.unwrap();

    db.migrate().await.unwrap();

    assert!(repo.get(GOLD_18K_SYMBOL).await.unwrap().is_some());
}

#[tokio::test]
async fn concurrent_readers_see_a_whole_row() {
    let (_dir, _path, db) = setup_db().await;
    let repo = std::sync::Arc::new(SqlxPriceRepository::new(db.pool.clone()));
    repo.upsert(&price("a", 1, 0)).await.unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let repo = repo.clone();
        tasks.spawn(async move {
            if i % 4 == 0 {
                let rial = 1_000 + i;
                repo.upsert(&price(&format!("name-{rial}"), rial, 0))
                    .await
                    .unwrap();
            }
            repo.get(GOLD_18K_SYMBOL).await.unwrap().unwrap()
        });
    }

    while let Some(res) = tasks.join_next().await {
        let row = res.unwrap();
        // name and price are written together, never mixed across writes
        let expected = if row.price_minor_units == 1 {
            "a".to_string()
        } else {
            format!("name-{}", row.price_minor_units)
        };
        assert_eq!(row.name, expected);
    }
}
