use std::sync::Arc;

use anyhow::Context;
use gold_cache::{
    app::{App, shutdown_signal},
    config::AppConfig,
    market::brs::BrsClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    common::logger::init_tracing("gold-cache", is_production);

    let cfg = AppConfig::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "invalid configuration"))?;

    tracing::info!(?cfg, "starting gold price service");

    let fetcher = BrsClient::new(
        cfg.upstream_url.clone(),
        cfg.api_key.clone(),
        cfg.fetch_timeout,
    )
    .context("failed to build upstream client")?;

    let app = App::init(cfg.clone(), Arc::new(fetcher))
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "cannot start without a cache store"))?;

    app.run(cfg.listen_addr(), shutdown_signal()).await?;

    Ok(())
}
