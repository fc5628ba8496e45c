use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::api::AppState;
use crate::cache::query::{PriceView, QueryError};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness only. Touches neither the store nor upstream.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Latest cached 18k gold price, flagged stale when older than the threshold.
pub async fn gold_18k(State(state): State<Arc<AppState>>) -> Result<Json<PriceView>, QueryError> {
    state.query.latest().await.map(Json)
}
