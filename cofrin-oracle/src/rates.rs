//! Exchange-rate lookup against the AwesomeAPI public quote endpoint.
//!
//! A failed lookup is never fatal: the pipeline falls back to rate 1.0 and
//! keeps the stated amount, surfacing the miss only as a log event.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use cofrin_core::CANONICAL_CURRENCY;
use serde_json::Value;
use tracing::warn;

const DEFAULT_BASE_URL: &str = "https://economia.awesomeapi.com.br";

/// `code -> BRL` rate source. Returns 1.0 for the canonical currency or
/// when the quote cannot be fetched.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn get_rate(&self, currency_code: &str) -> f64;
}

#[derive(Clone)]
pub struct RateClient {
    http: reqwest::Client,
    base_url: String,
}

impl RateClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, code: &str) -> Result<f64> {
        let pair = format!("{code}-{CANONICAL_CURRENCY}");
        let url = format!("{}/json/last/{pair}", self.base_url);
        let resp = self.http.get(&url).send().await.context("rate request")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("rate error: {status}");
        }

        // Response shape: { "USDBRL": { "bid": "5.25", ... } }
        let body: Value = resp.json().await.context("parse rate response")?;
        let key = format!("{code}{CANONICAL_CURRENCY}");
        let bid = body
            .get(&key)
            .and_then(|q| q.get("bid"))
            .and_then(|b| b.as_str())
            .and_then(|b| b.parse::<f64>().ok())
            .with_context(|| format!("missing bid for {pair}"))?;

        if bid <= 0.0 {
            bail!("non-positive bid for {pair}");
        }
        Ok(bid)
    }
}

impl Default for RateClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateSource for RateClient {
    async fn get_rate(&self, currency_code: &str) -> f64 {
        let code = currency_code.trim().to_uppercase();
        if code.is_empty() || code == CANONICAL_CURRENCY {
            return 1.0;
        }
        match self.fetch(&code).await {
            Ok(rate) => rate,
            Err(err) => {
                warn!(currency = %code, error = %err, "rate lookup failed, keeping amount unconverted");
                1.0
            }
        }
    }
}
