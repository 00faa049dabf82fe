//! Mock market data provider for integration testing.
//!
//! Provides a deterministic `MarketDataProvider` implementation backed by
//! an in-memory price table — no external dependencies. Prices, forced
//! failures, and the fetch log are fully controllable from test code.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use verdict::market::{MarketDataProvider, Quote};

/// A mock quote provider for deterministic testing.
pub struct MockProvider {
    prices: Mutex<HashMap<String, f64>>,
    /// Every symbol fetched, in order.
    fetches: Mutex<Vec<String>>,
    /// If set, all lookups return `None` regardless of the price table.
    failing: Mutex<bool>,
}

impl MockProvider {
    pub fn new(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: Mutex::new(
                prices
                    .iter()
                    .map(|(s, p)| (s.to_string(), *p))
                    .collect(),
            ),
            fetches: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    /// Force all subsequent lookups to fail.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Update one symbol's price.
    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    /// Symbols fetched so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch_price(&self, symbol: &str) -> Option<Quote> {
        self.fetches.lock().unwrap().push(symbol.to_string());
        if *self.failing.lock().unwrap() {
            return None;
        }
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .map(|p| Quote { price: *p })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
