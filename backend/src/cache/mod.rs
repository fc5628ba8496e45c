pub mod model;
pub mod query;
pub mod repository;
pub mod repository_sqlx;

pub use model::{CachedPrice, GOLD_18K_SYMBOL};
pub use query::{PriceView, QueryError, QueryService};
pub use repository::PriceRepository;
pub use repository_sqlx::SqlxPriceRepository;
