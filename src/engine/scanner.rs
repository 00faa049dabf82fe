//! Maturity scanner.
//!
//! Walks the ledger index and decides which ledgers/picks have aged enough
//! to be judged. A pick's timeframe ("24h", "7d", "1m", "1y") translates to
//! a required number of elapsed days; the ledger date fixes how many days
//! have actually passed. Same-day ledgers are never candidates — intraday
//! noise says nothing about a pick's outcome.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::{debug, info, warn};

use crate::store::FileStore;
use crate::types::{IndexEntry, Pick};

// ---------------------------------------------------------------------------
// Scan output
// ---------------------------------------------------------------------------

/// Eligible picks for one ledger date, ready for verification.
#[derive(Debug, Clone)]
pub struct MatureBatch {
    pub date: NaiveDate,
    pub picks: Vec<Pick>,
}

/// Result of one index walk.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Per-date batches with at least one eligible pick.
    pub batches: Vec<MatureBatch>,
    /// Ledger files that exist but failed to parse (isolated failures).
    pub failed: Vec<String>,
    /// Index entries old enough to be candidates (`days_passed >= 1`).
    pub candidates: usize,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Decides which ledgers/picks are ready for evaluation.
pub struct MaturityScanner {
    /// Required days for picks with a missing or unparsable timeframe.
    default_days: i64,
}

impl MaturityScanner {
    pub fn new(default_days: i64) -> Self {
        Self { default_days }
    }

    /// Whole days elapsed since the ledger's date (midnight UTC), floored.
    pub fn days_passed(ledger_date: NaiveDate, now: DateTime<Utc>) -> i64 {
        let start = NaiveDateTime::new(ledger_date, NaiveTime::MIN).and_utc();
        (now - start).num_days()
    }

    /// Translate a pick timeframe into required elapsed days.
    ///
    /// Hours round up (`ceil(value / 24)`), days map 1:1, months count as
    /// 30 days, years as 365. Anything unparsable falls back to the
    /// configured default.
    pub fn required_days(&self, timeframe: Option<&str>) -> i64 {
        let Some(tf) = timeframe else {
            return self.default_days;
        };
        let tf = tf.trim();

        let split = tf
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tf.len());
        let (digits, unit) = tf.split_at(split);
        let Ok(value) = digits.parse::<i64>() else {
            return self.default_days;
        };

        match unit.to_ascii_lowercase().as_str() {
            "h" => (value + 23) / 24,
            "d" => value,
            "m" => value * 30,
            "y" => value * 365,
            _ => self.default_days,
        }
    }

    /// Picks from one ledger that have reached maturity.
    pub fn eligible(&self, ledger_date: NaiveDate, picks: &[Pick], now: DateTime<Utc>) -> Vec<Pick> {
        let days_passed = Self::days_passed(ledger_date, now);
        picks
            .iter()
            .filter(|p| days_passed >= self.required_days(p.timeframe.as_deref()))
            .cloned()
            .collect()
    }

    /// Walk the ledger index and collect every mature (date, picks) batch.
    ///
    /// Ledgers referenced by the index but missing on disk are skipped
    /// (not yet available); malformed ledgers are recorded as failed units
    /// without aborting the walk.
    pub fn scan(&self, store: &FileStore, index: &[IndexEntry], now: DateTime<Utc>) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        for entry in index {
            if Self::days_passed(entry.date, now) < 1 {
                debug!(date = %entry.date, "Ledger too recent, skipping");
                continue;
            }
            outcome.candidates += 1;

            let ledger = match store.load_ledger(entry.date) {
                Ok(Some(ledger)) => ledger,
                Ok(None) => continue,
                Err(e) => {
                    warn!(date = %entry.date, error = %e, "Ledger unreadable, skipping");
                    outcome.failed.push(format!("ledger {}", entry.date));
                    continue;
                }
            };

            let picks = self.eligible(entry.date, &ledger.picks, now);
            if picks.is_empty() {
                debug!(
                    date = %entry.date,
                    total = ledger.picks.len(),
                    "No picks matured yet"
                );
                continue;
            }

            debug!(
                date = %entry.date,
                eligible = picks.len(),
                total = ledger.picks.len(),
                "Ledger has matured picks"
            );
            outcome.batches.push(MatureBatch {
                date: entry.date,
                picks,
            });
        }

        info!(
            indexed = index.len(),
            candidates = outcome.candidates,
            mature_ledgers = outcome.batches.len(),
            "Maturity scan complete"
        );

        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
