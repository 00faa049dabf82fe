//! Shared types for the VERDICT controller.
//!
//! These types form the data model used across all modules. Every artifact
//! here is exchanged as JSON with the surrounding (non-Rust) system, so the
//! wire shapes are camelCase and unknown upstream fields are carried through
//! flattened maps rather than dropped.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Picks & ledgers
// ---------------------------------------------------------------------------

/// Recorded entry metrics attached to a pick by the upstream generator.
///
/// Only `price` is interpreted here; everything else (scores, indicator
/// snapshots) is preserved verbatim for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickMetrics {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single recommendation produced by the external pick generator.
///
/// Read-only: picks are copied into [`VerifiedPick`]s at verification time
/// and never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pick {
    pub symbol: String,
    pub algorithm: String,
    /// Expected evaluation horizon, e.g. "24h", "7d", "1m", "1y".
    #[serde(default)]
    pub timeframe: Option<String>,
    /// Entry price as recorded at pick time (legacy top-level field).
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub metrics: Option<PickMetrics>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Pick {
    /// Resolve the entry price for return computation.
    ///
    /// Resolution order is a contract, not an accident: `metrics.price`
    /// first, then the top-level `price`. Returns `None` when neither is
    /// present — such a pick cannot be verified.
    pub fn entry_price(&self) -> Option<f64> {
        self.metrics.as_ref().and_then(|m| m.price).or(self.price)
    }

    /// Helper to build a test pick with sensible defaults.
    #[cfg(test)]
    pub fn sample(symbol: &str, algorithm: &str, timeframe: &str, price: f64) -> Self {
        Pick {
            symbol: symbol.to_string(),
            algorithm: algorithm.to_string(),
            timeframe: Some(timeframe.to_string()),
            price: Some(price),
            metrics: Some(PickMetrics {
                price: Some(price),
                extra: serde_json::Map::new(),
            }),
            extra: serde_json::Map::new(),
        }
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({})",
            self.algorithm,
            self.symbol,
            self.timeframe.as_deref().unwrap_or("no timeframe"),
        )
    }
}

/// One dated batch of picks, externally produced and immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    pub picks: Vec<Pick>,
}

/// One entry in the externally maintained ledger index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Verification artifacts
// ---------------------------------------------------------------------------

/// A pick whose outcome has been judged: the original pick plus the exit
/// price, realized return, and verification timestamp. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPick {
    #[serde(flatten)]
    pub pick: Pick,
    pub exit_price: f64,
    /// Realized return in percent: (exit − entry) / entry × 100.
    pub realized_return: f64,
    pub verified_at: DateTime<Utc>,
}

/// Persisted outcome record for one ledger date.
///
/// Overwritten in full when the date is re-verified, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub date: NaiveDate,
    pub total_picks: usize,
    /// Arithmetic mean of the verified picks' realized returns, in percent.
    pub avg_return: f64,
    pub picks: Vec<VerifiedPick>,
}

impl fmt::Display for Audit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} picks, avg {:+.2}%",
            self.date, self.total_picks, self.avg_return,
        )
    }
}

/// Consolidated, time-ordered performance report for the presentation layer.
/// Fully regenerated each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    /// Audits sorted newest-first.
    pub audits: Vec<Audit>,
    pub last_updated: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tuning inputs & engine configuration
// ---------------------------------------------------------------------------

/// One simulated (algorithm, threshold) evaluation from the external
/// backtest simulator. Read-only input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningResult {
    pub algorithm: String,
    pub threshold: f64,
    pub total_trades: u32,
    /// Win rate in percent (0–100).
    pub win_rate: f64,
    pub avg_return: f64,
    pub sharpe_ratio: f64,
}

/// Wire shape of the simulator output file: `{results: [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningReport {
    #[serde(default)]
    pub results: Vec<TuningResult>,
}

/// Live realized performance for one algorithm, externally derived from
/// verified picks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmStats {
    /// Win rate in percent (0–100).
    pub win_rate: f64,
    /// Number of verified picks backing the win rate.
    pub verified: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Wire shape of the live stats file: `{byAlgorithm: {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStats {
    #[serde(default)]
    pub by_algorithm: BTreeMap<String, AlgorithmStats>,
}

/// Versioned per-algorithm decision thresholds plus a change log, persisted
/// across runs and consumed by the external pick generator.
///
/// Mutated in place by the optimizer, persisted only when changed. A sorted
/// map keeps phase output deterministic across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub last_optimized: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
    /// Ordered log of threshold adjustments, newest last.
    #[serde(default)]
    pub adjustments: Vec<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Classified failures surfaced in run summaries.
#[derive(Debug, thiserror::Error)]
pub enum VerdictError {
    #[error("Malformed {kind} file {path}: {message}")]
    Parse {
        kind: &'static str,
        path: String,
        message: String,
    },

    #[error("Storage error ({path}): {message}")]
    Storage { path: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
