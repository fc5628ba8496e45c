use std::time::Duration;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, instrument};

use crate::market::brs::parser::extract_gold_18k;
use crate::market::errors::FetchError;
use crate::market::types::{PriceFetcher, PriceSample};

// The feed rejects non-browser agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Clone)]
pub struct BrsClient {
    http: Client,
    url: String,
    api_key: String,
}

impl BrsClient {
    /// `timeout` bounds the whole call, connect through body read.
    pub fn new(url: String, api_key: String, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(FetchError::request)?;

        Ok(Self { http, url, api_key })
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_gold_18k(&self) -> Result<PriceSample, FetchError> {
        let resp = self
            .http
            .get(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(FetchError::request)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(FetchError::request)?;
        let sample = extract_gold_18k(&body, Utc::now().trunc_subsecs(0))?;

        debug!(
            name = %sample.name,
            price_rial = sample.price_minor_units,
            "brs gold price fetched"
        );

        Ok(sample)
    }
}

#[async_trait]
impl PriceFetcher for BrsClient {
    async fn fetch(&self) -> Result<PriceSample, FetchError> {
        self.fetch_gold_18k().await
    }
}
