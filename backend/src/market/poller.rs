//! Gold price poller
//!
//! Drives the upstream fetcher on a fixed interval and upserts every
//! successful sample into the price cache. It is the only writer.
//!
//! Data flow:
//! tick → PriceFetcher → PriceRepository (upsert)
//!
//! At most one fetch is in flight. A tick that arrives while a fetch is still
//! running is dropped, not queued. Failures of any kind are logged and leave
//! the cached row untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use common::logger::{TraceId, annotate_symbol, root_span, warn_if_slow};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, warn};

use crate::cache::model::CachedPrice;
use crate::cache::repository::PriceRepository;
use crate::market::types::PriceFetcher;

const SLOW_FETCH: Duration = Duration::from_secs(3);
const SLOW_WRITE: Duration = Duration::from_millis(100);

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct PollerCounters {
    pub ticks: Arc<AtomicU64>,
    pub skipped: Arc<AtomicU64>,
    pub updated: Arc<AtomicU64>,
    pub fetch_failures: Arc<AtomicU64>,
    pub store_failures: Arc<AtomicU64>,
}

impl PollerCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Updated(CachedPrice),
    /// Another cycle held the in-flight guard.
    Skipped,
    FetchFailed,
    /// The sample was valid but could not be persisted; it is lost.
    StoreFailed,
}

pub struct Poller {
    symbol: String,
    fetcher: Arc<dyn PriceFetcher>,
    repo: Arc<dyn PriceRepository>,

    /// Held for exactly one fetch + upsert. Only ever `try_lock`ed.
    in_flight: Mutex<()>,

    counters: PollerCounters,
}

impl Poller {
    pub fn new(
        symbol: &str,
        fetcher: Arc<dyn PriceFetcher>,
        repo: Arc<dyn PriceRepository>,
        counters: PollerCounters,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            fetcher,
            repo,
            in_flight: Mutex::new(()),
            counters,
        }
    }

    pub fn counters(&self) -> &PollerCounters {
        &self.counters
    }

    /// Runs one fetch + write cycle unless another one is already running,
    /// in which case it returns [`CycleOutcome::Skipped`] immediately.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            PollerCounters::bump(&self.counters.skipped);
            info!(symbol = %self.symbol, "previous fetch still in progress, skipping tick");
            return CycleOutcome::Skipped;
        };

        let span = root_span("poll_cycle", &TraceId::new());
        self.fetch_and_store().instrument(span).await
    }

    async fn fetch_and_store(&self) -> CycleOutcome {
        annotate_symbol(&self.symbol);

        let sample = match warn_if_slow("upstream_fetch", SLOW_FETCH, self.fetcher.fetch()).await {
            Ok(sample) => sample,
            Err(e) => {
                PollerCounters::bump(&self.counters.fetch_failures);
                warn!(
                    error = %e,
                    kind = e.kind(),
                    "fetch failed, keeping last cached value"
                );
                return CycleOutcome::FetchFailed;
            }
        };

        let price = CachedPrice::from_sample(&self.symbol, sample);

        if let Err(e) = warn_if_slow("db_upsert_price", SLOW_WRITE, self.repo.upsert(&price)).await
        {
            PollerCounters::bump(&self.counters.store_failures);
            error!(error = ?e, "failed to persist fetched price, dropping this tick");
            return CycleOutcome::StoreFailed;
        }

        PollerCounters::bump(&self.counters.updated);
        info!(
            name = %price.name,
            price_rial = price.price_minor_units,
            fetched_at = %price.fetched_at,
            "cached price updated"
        );

        CycleOutcome::Updated(price)
    }

    /// Fixed-interval driver. Returns once `cancel` fires.
    ///
    /// The first tick lands one `period` after start; the caller is expected
    /// to have made the initial attempt itself. Each tick runs on its own
    /// task so the schedule keeps ticking while a slow fetch is in flight,
    /// and the in-flight guard turns overlapping ticks into skips.
    ///
    /// On cancellation an in-flight cycle gets up to `drain` to finish and is
    /// abandoned after that.
    pub async fn run(self: Arc<Self>, period: Duration, drain: Duration, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut cycles = JoinSet::new();

        info!(
            symbol = %self.symbol,
            every_secs = period.as_secs(),
            "gold price poller started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    PollerCounters::bump(&self.counters.ticks);
                    let poller = Arc::clone(&self);
                    cycles.spawn(async move { poller.run_cycle().await });
                }

                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "poll cycle task failed");
                    }
                }
            }
        }

        info!(in_flight = cycles.len(), "gold price poller stopping");

        let drained = tokio::time::timeout(drain, async {
            while cycles.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                drain_ms = drain.as_millis() as u64,
                "in-flight fetch abandoned at shutdown"
            );
            cycles.abort_all();
        }

        info!("gold price poller stopped");
    }
}
