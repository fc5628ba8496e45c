use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    /// Connect failure, timeout, or a body that could not be read.
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream body is not valid JSON of the expected shape: {0}")]
    Format(#[source] serde_json::Error),

    #[error("upstream data rejected: {0}")]
    Data(String),
}

impl FetchError {
    /// Credentials travel in the query string, so the URL is dropped before
    /// the error can reach a log line.
    pub fn request(err: reqwest::Error) -> Self {
        Self::Request(err.without_url())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Status(_) => "status",
            Self::Format(_) => "format",
            Self::Data(_) => "data",
        }
    }
}
