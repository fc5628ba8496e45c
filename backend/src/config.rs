use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_DB_PATH: &str = "/data/gold.db";
pub const DEFAULT_UPSTREAM_URL: &str = "https://BrsApi.ir/Api/Market/Gold_Currency.php";

/// Hard ceiling on a single upstream call.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Age past which a cached price is reported as stale.
pub const STALE_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Time allowed for in-flight requests and the poller to wind down.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Per-request budget on the read interface.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BRS_API_KEY environment variable is required")]
    MissingApiKey,

    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Clone)]
pub struct AppConfig {
    /// Credential for the upstream feed, sent as the `key` query parameter.
    pub api_key: String,

    /// Base URL of the upstream gold/currency endpoint.
    pub upstream_url: String,

    /// HTTP listen port for the read interface.
    pub port: u16,

    /// Fixed wall-clock period between scheduled fetches.
    pub poll_interval: Duration,

    /// SQLite file backing the price cache.
    pub db_path: String,

    // =========================
    // Fixed operational limits
    // =========================
    pub fetch_timeout: Duration,
    pub stale_threshold: Duration,
    pub shutdown_grace: Duration,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("BRS_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
                reason: "expected a TCP port number",
            })?,
            None => DEFAULT_PORT,
        };

        let poll_secs = match get("POLL_INTERVAL") {
            Some(raw) => match raw.trim().parse::<u64>().ok() {
                Some(0) => {
                    return Err(ConfigError::Invalid {
                        key: "POLL_INTERVAL",
                        value: raw,
                        reason: "must be at least one second",
                    });
                }
                Some(secs) => secs,
                None => {
                    return Err(ConfigError::Invalid {
                        key: "POLL_INTERVAL",
                        value: raw,
                        reason: "expected a whole number of seconds",
                    });
                }
            },
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            api_key,
            upstream_url: get("BRS_API_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            port,
            poll_interval: Duration::from_secs(poll_secs),
            db_path: get("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),

            fetch_timeout: FETCH_TIMEOUT,
            stale_threshold: STALE_THRESHOLD,
            shutdown_grace: SHUTDOWN_GRACE,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

// Keeps the credential out of `{:?}` output.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"<redacted>")
            .field("upstream_url", &self.upstream_url)
            .field("port", &self.port)
            .field("poll_interval", &self.poll_interval)
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}
