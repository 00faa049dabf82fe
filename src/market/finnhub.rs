//! Finnhub market data provider.
//!
//! Resolves stock symbols to their current quote via the Finnhub REST API.
//!
//! API docs: https://finnhub.io/docs/api/quote
//! Base URL: https://finnhub.io/api/v1
//! Rate limit: 60 requests/minute on the free tier — the verifier batches
//! and paces its lookups accordingly.
//! Auth: `token` query parameter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{MarketDataProvider, Quote};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_NAME: &str = "finnhub";

// ---------------------------------------------------------------------------
// API response types (Finnhub JSON → Rust)
// ---------------------------------------------------------------------------

/// Finnhub `/quote` response. We only deserialize the fields we need.
/// An unknown symbol comes back as all zeros rather than an HTTP error.
#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    /// Current price.
    #[serde(rename = "c", default)]
    current: f64,
    /// Previous close (kept for logging context).
    #[serde(rename = "pc", default)]
    previous_close: f64,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Finnhub quote client.
pub struct FinnhubProvider {
    http: Client,
    api_key: String,
}

impl FinnhubProvider {
    /// Create a new Finnhub client with a bounded request timeout.
    pub fn new(api_key: String, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("VERDICT/0.1.0")
            .build()
            .context("Failed to build HTTP client for Finnhub")?;

        Ok(Self { http, api_key })
    }

    async fn quote(&self, symbol: &str) -> Result<FinnhubQuote> {
        let url = format!(
            "{BASE_URL}/quote?symbol={}&token={}",
            urlencoding::encode(symbol),
            self.api_key,
        );

        debug!(symbol, "Fetching Finnhub quote");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Finnhub request failed for {symbol}"))?
            .error_for_status()
            .with_context(|| format!("Finnhub returned error status for {symbol}"))?;

        let quote: FinnhubQuote = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse Finnhub quote for {symbol}"))?;

        Ok(quote)
    }
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    async fn fetch_price(&self, symbol: &str) -> Option<Quote> {
        match self.quote(symbol).await {
            Ok(q) if q.current > 0.0 => {
                debug!(
                    symbol,
                    price = q.current,
                    previous_close = q.previous_close,
                    "Quote received"
                );
                Some(Quote { price: q.current })
            }
            Ok(_) => {
                // Finnhub signals an unknown symbol with a zeroed quote.
                debug!(symbol, "No quote available (unknown symbol?)");
                None
            }
            Err(e) => {
                warn!(symbol, error = %e, "Quote fetch failed — pick will be retried");
                None
            }
        }
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
