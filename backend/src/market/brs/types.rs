use serde::Deserialize;

/// Top-level response. Entries are kept untyped: the list mixes instruments
/// and only the one we consume has to match [`BrsItem`].
#[derive(Debug, Deserialize)]
pub struct BrsEnvelope {
    #[serde(default)]
    pub gold: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BrsItem {
    pub symbol: String,

    #[serde(default)]
    pub name: String,

    /// Toman.
    pub price: f64,
}
