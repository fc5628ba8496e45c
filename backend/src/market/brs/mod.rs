//! BrsApi gold/currency feed.

pub mod client;
pub mod parser;
pub mod types;

pub use client::BrsClient;
pub use parser::{
    FALLBACK_NAME, GOLD_18K_UPSTREAM_SYMBOL, MINOR_UNITS_PER_MAJOR, extract_gold_18k, to_minor_units,
};
