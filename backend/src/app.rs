//! Process lifecycle.
//!
//! Startup order:
//! store opened and migrated → initial fetch (best effort) → listener bound
//! → poller started → read interface served.
//!
//! The socket only exists once the initial fetch has settled, so nothing can
//! connect while startup is still waiting on upstream.
//!
//! Shutdown order:
//! poller cancelled (no new ticks) → listener stops accepting and in-flight
//! requests drain → store closed. Everything after the stop signal shares one
//! deadline of the configured grace period; whatever is still running at the
//! deadline is aborted.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api;
use crate::cache::model::GOLD_18K_SYMBOL;
use crate::cache::query::QueryService;
use crate::cache::repository::PriceRepository;
use crate::cache::repository_sqlx::SqlxPriceRepository;
use crate::config::AppConfig;
use crate::db::Db;
use crate::error::AppError;
use crate::market::poller::{CycleOutcome, Poller, PollerCounters};
use crate::market::types::PriceFetcher;

/// Long-lived components, built once and shared by handle.
pub struct App {
    cfg: AppConfig,
    db: Db,
    poller: Arc<Poller>,
    query: QueryService,
}

impl App {
    /// Opens the store at `cfg.db_path`. The service cannot run without it,
    /// so any failure here is fatal.
    pub async fn init(cfg: AppConfig, fetcher: Arc<dyn PriceFetcher>) -> Result<Self, AppError> {
        let store_err = |source| AppError::StoreInit {
            path: cfg.db_path.clone(),
            source,
        };

        let db = Db::connect(&cfg.db_path).await.map_err(store_err)?;
        db.migrate().await.map_err(store_err)?;

        info!(path = %cfg.db_path, "price cache store ready");

        Ok(Self::with_db(cfg, db, fetcher))
    }

    /// Wires the components on top of an already migrated store.
    pub fn with_db(cfg: AppConfig, db: Db, fetcher: Arc<dyn PriceFetcher>) -> Self {
        let repo: Arc<dyn PriceRepository> = Arc::new(SqlxPriceRepository::new(db.pool.clone()));

        let poller = Arc::new(Poller::new(
            GOLD_18K_SYMBOL,
            fetcher,
            Arc::clone(&repo),
            PollerCounters::default(),
        ));
        let query = QueryService::new(repo, GOLD_18K_SYMBOL, cfg.stale_threshold);

        Self {
            cfg,
            db,
            poller,
            query,
        }
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub fn router(&self) -> Router {
        api::router(self.query.clone(), self.cfg.request_timeout)
    }

    /// One synchronous fetch before anything is served. Failure is logged and
    /// tolerated; the poller retries on its first tick.
    pub async fn initial_fetch(&self) -> CycleOutcome {
        info!("initial fetch");
        let outcome = self.poller.run_cycle().await;
        if !matches!(outcome, CycleOutcome::Updated(_)) {
            warn!(?outcome, "initial fetch failed, will retry on next tick");
        }
        outcome
    }

    /// Full startup: initial fetch, then bind `addr`, then [`App::serve`].
    pub async fn run<S>(self, addr: SocketAddr, shutdown: S) -> Result<(), AppError>
    where
        S: Future<Output = ()> + Send,
    {
        self.initial_fetch().await;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Starts the poller and serves on `listener` until `shutdown` resolves,
    /// then winds down within `cfg.shutdown_grace`.
    ///
    /// Does not fetch on its own; see [`App::initial_fetch`].
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> Result<(), AppError>
    where
        S: Future<Output = ()> + Send,
    {
        let addr = listener.local_addr().map_err(AppError::Server)?;

        let poller_cancel = CancellationToken::new();
        let mut poller_task = tokio::spawn(Arc::clone(&self.poller).run(
            self.cfg.poll_interval,
            self.cfg.shutdown_grace,
            poller_cancel.clone(),
        ));

        let stop_accepting = CancellationToken::new();
        let mut server = tokio::spawn(
            axum::serve(listener, self.router())
                .with_graceful_shutdown(stop_accepting.clone().cancelled_owned())
                .into_future(),
        );

        info!(%addr, "gold price service listening");

        tokio::pin!(shutdown);
        let early_exit = tokio::select! {
            _ = &mut shutdown => None,
            joined = &mut server => Some(joined),
        };

        if let Some(joined) = early_exit {
            error!("http server exited before shutdown was requested");
            poller_cancel.cancel();
            let _ = poller_task.await;
            self.db.close().await;
            return flatten_server_result(joined);
        }

        info!("shutting down");
        let grace = self.cfg.shutdown_grace;
        let deadline = Instant::now() + grace;

        poller_cancel.cancel();
        stop_accepting.cancel();

        let wound_down = timeout_at(deadline, async {
            let _ = (&mut poller_task).await;
            (&mut server).await
        })
        .await;

        let result = match wound_down {
            Ok(joined) => flatten_server_result(joined),
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "grace period elapsed, abandoning in-flight work"
                );
                poller_task.abort();
                server.abort();
                Ok(())
            }
        };

        if timeout_at(deadline, self.db.close()).await.is_err() {
            warn!("store did not close in time");
        }

        info!("shutdown complete");
        result
    }
}

fn flatten_server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(res) => res.map_err(AppError::Server),
        Err(e) => Err(AppError::Server(std::io::Error::other(e))),
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
