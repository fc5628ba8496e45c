//! HTTP read interface.
//!
//! Handlers only ever read the local cache; nothing here calls upstream.

pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::cache::query::QueryService;

/// Application state shared by all handlers.
pub struct AppState {
    pub query: QueryService,
}

pub fn router(query: QueryService, request_timeout: Duration) -> Router {
    let state = Arc::new(AppState { query });

    Router::new()
        .route("/api/gold/18k", get(handlers::gold_18k))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}
