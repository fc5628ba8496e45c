use std::net::SocketAddr;

use thiserror::Error;

use crate::config::ConfigError;

/// Process-level failures. Every variant is fatal: the service either never
/// starts or stops serving.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialise cache store at {path}")]
    StoreInit {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("http server failed")]
    Server(#[source] std::io::Error),
}
