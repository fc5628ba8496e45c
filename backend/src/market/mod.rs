pub mod brs;
pub mod errors;
pub mod poller;
pub mod types;

pub use errors::FetchError;
pub use poller::{CycleOutcome, Poller, PollerCounters};
pub use types::{PriceFetcher, PriceSample};
