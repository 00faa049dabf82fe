//! Performance verifier.
//!
//! Computes realized returns for matured picks against current market
//! prices. Quote lookups are cached per symbol for the whole run (misses
//! included) and issued in small concurrent groups with a pause in between,
//! respecting provider quotas. A pick whose quote is unavailable stays
//! unverified and is retried on a later run — it is never booked against
//! absent data.

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::VerifierConfig;
use crate::market::MarketDataProvider;
use crate::types::{Audit, Pick, VerifiedPick};

/// Realized return in percent for one entry/exit pair.
pub fn realized_return(entry_price: f64, exit_price: f64) -> f64 {
    (exit_price - entry_price) / entry_price * 100.0
}

/// Verifies matured picks and assembles per-date audits.
///
/// Persistence is the batch runner's job; `verify` is a function of its
/// inputs and the provider only, which keeps it testable against a mock.
pub struct Verifier {
    provider: Arc<dyn MarketDataProvider>,
    batch_size: usize,
    batch_delay: Duration,
    /// Run-scoped quote cache. `None` marks a failed lookup so a flaky
    /// symbol is not re-queried for every pick naming it.
    cache: Mutex<HashMap<String, Option<f64>>>,
}

impl Verifier {
    pub fn new(provider: Arc<dyn MarketDataProvider>, cfg: &VerifierConfig) -> Self {
        Self {
            provider,
            batch_size: cfg.batch_size.max(1),
            batch_delay: Duration::from_millis(cfg.batch_delay_ms),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch quotes for any of `symbols` not yet cached, in paced groups.
    async fn prefetch(&self, symbols: &[String]) {
        let missing: Vec<String> = {
            let cache = self.cache.lock().await;
            symbols
                .iter()
                .filter(|s| !cache.contains_key(*s))
                .cloned()
                .collect()
        };
        if missing.is_empty() {
            return;
        }

        debug!(
            provider = self.provider.name(),
            symbols = missing.len(),
            batch_size = self.batch_size,
            "Fetching quotes"
        );

        for (i, group) in missing.chunks(self.batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }
            let quotes = join_all(group.iter().map(|s| self.provider.fetch_price(s))).await;

            let mut cache = self.cache.lock().await;
            for (symbol, quote) in group.iter().zip(quotes) {
                cache.insert(symbol.clone(), quote.map(|q| q.price));
            }
        }
    }

    /// Verify one ledger date's eligible picks.
    ///
    /// Returns `None` when nothing could be verified this run — no audit is
    /// written for the date and every skipped pick is retried later.
    pub async fn verify(
        &self,
        date: NaiveDate,
        picks: &[Pick],
        now: DateTime<Utc>,
    ) -> Option<Audit> {
        if picks.is_empty() {
            return None;
        }

        // One fetch per distinct symbol per run.
        let mut seen = HashSet::new();
        let symbols: Vec<String> = picks
            .iter()
            .filter(|p| seen.insert(p.symbol.clone()))
            .map(|p| p.symbol.clone())
            .collect();
        self.prefetch(&symbols).await;

        let cache = self.cache.lock().await;
        let mut verified: Vec<VerifiedPick> = Vec::new();

        for pick in picks {
            let Some(entry_price) = pick.entry_price() else {
                warn!(%pick, "Pick has no recorded entry price, skipping");
                continue;
            };
            if entry_price <= 0.0 {
                warn!(%pick, entry_price, "Non-positive entry price, skipping anomaly");
                continue;
            }
            let Some(exit_price) = cache.get(&pick.symbol).copied().flatten() else {
                debug!(%pick, "Quote unavailable, pick will be retried");
                continue;
            };

            verified.push(VerifiedPick {
                pick: pick.clone(),
                exit_price,
                realized_return: realized_return(entry_price, exit_price),
                verified_at: now,
            });
        }

        if verified.is_empty() {
            info!(%date, eligible = picks.len(), "No picks verified this run");
            return None;
        }

        let avg_return =
            verified.iter().map(|p| p.realized_return).sum::<f64>() / verified.len() as f64;
        let audit = Audit {
            date,
            total_picks: verified.len(),
            avg_return,
            picks: verified,
        };
        info!(%audit, eligible = picks.len(), "Ledger verified");
        Some(audit)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
