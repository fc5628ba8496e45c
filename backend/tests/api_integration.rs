
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration as ChronoDuration, SubsecRound, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use gold_cache::api;
use gold_cache::cache::{CachedPrice, GOLD_18K_SYMBOL, PriceRepository, QueryService};
use gold_cache::config::STALE_THRESHOLD;

use mocks::{FailingRepository, MemoryRepository, NAME};

/// Reads take longer than any sane request budget.
struct SlowRepository(Duration);

#[async_trait]
impl PriceRepository for SlowRepository {
    async fn upsert(&self, _price: &CachedPrice) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get(&self, _symbol: &str) -> anyhow::Result<Option<CachedPrice>> {
        tokio::time::sleep(self.0).await;
        Ok(None)
    }
}

fn app(repo: Arc<dyn PriceRepository>) -> Router {
    let query = QueryService::new(repo, GOLD_18K_SYMBOL, STALE_THRESHOLD);
    api::router(query, Duration::from_secs(5))
}

fn cached(price: i64, age: ChronoDuration) -> CachedPrice {
    CachedPrice {
        symbol: GOLD_18K_SYMBOL.to_string(),
        name: NAME.to_string(),
        price_minor_units: price,
        fetched_at: Utc::now().trunc_subsecs(0) - age,
    }
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn empty_cache_answers_503_with_error_body() {
    let (status, body) = get(app(Arc::new(MemoryRepository::new())), "/api/gold/18k").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, serde_json::json!({ "error": "no cached price available" }));
    assert!(body.get("price").is_none());
}

#[tokio::test]
async fn fresh_price_is_served_with_exact_fields() {
    let repo = Arc::new(MemoryRepository::new());
    let row = cached(42_500_000, ChronoDuration::seconds(30));
    repo.insert_direct(row.clone());

    let (status, body) = get(app(repo), "/api/gold/18k").await;

    assert_eq!(status, StatusCode::OK);

    let obj = body.as_object().unwrap();
    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["fetchedAt", "name", "price", "stale"]);

    assert_eq!(body["name"], NAME);
    assert_eq!(body["price"], 42_500_000);
    assert_eq!(body["stale"], false);
    assert_eq!(
        body["fetchedAt"],
        row.fetched_at
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );
}

#[tokio::test]
async fn old_price_is_served_but_flagged_stale() {
    let repo = Arc::new(MemoryRepository::new());
    repo.insert_direct(cached(41_000_000, ChronoDuration::minutes(6)));

    let (status, body) = get(app(repo), "/api/gold/18k").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], 41_000_000);
    assert_eq!(body["stale"], true);
}

#[tokio::test]
async fn staleness_flips_with_time_alone() {
    let repo = Arc::new(MemoryRepository::new());
    let row = cached(10, ChronoDuration::zero());
    repo.insert_direct(row.clone());
    let query = QueryService::new(repo.clone(), GOLD_18K_SYMBOL, STALE_THRESHOLD);

    let before = query
        .latest_at(row.fetched_at + ChronoDuration::seconds(299))
        .await
        .unwrap();
    let after = query
        .latest_at(row.fetched_at + ChronoDuration::seconds(301))
        .await
        .unwrap();

    assert!(!before.stale);
    assert!(after.stale);
    assert_eq!(before.price, after.price);
    assert_eq!(before.fetched_at, after.fetched_at);
    assert_eq!(repo.writes(), 0);
}

#[tokio::test]
async fn health_is_ok_even_when_the_store_is_broken() {
    let (status, body) = get(app(Arc::new(FailingRepository)), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn store_read_failure_answers_500() {
    let (status, body) = get(app(Arc::new(FailingRepository)), "/api/gold/18k").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({ "error": "failed to read cached price" }));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let response = app(Arc::new(MemoryRepository::new()))
        .oneshot(
            Request::builder()
                .uri("/api/gold/24k")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn slow_read_is_cut_off_with_408() {
    let query = QueryService::new(
        Arc::new(SlowRepository(Duration::from_secs(30))),
        GOLD_18K_SYMBOL,
        STALE_THRESHOLD,
    );
    let router = api::router(query, Duration::from_millis(100));

    let started = std::time::Instant::now();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/gold/18k")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(5));
}
