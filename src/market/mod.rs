//! Market data integrations.
//!
//! Defines the `MarketDataProvider` trait and provides the Finnhub
//! implementation. Providers never error outward: a failed or empty lookup
//! is `None`, logged internally, and the affected pick is simply retried on
//! a later run.

pub mod finnhub;

use async_trait::async_trait;

/// A current quote for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
}

/// Abstraction over market data providers.
///
/// Implementors resolve a symbol to its current price. Any failure mode —
/// timeout, HTTP error, unknown symbol — maps to `None`; the caller treats
/// absent data as "retry later", never as fatal.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the current price for a symbol, or `None` if unavailable.
    async fn fetch_price(&self, symbol: &str) -> Option<Quote>;

    /// Provider name for logging and identification.
    fn name(&self) -> &str;
}
