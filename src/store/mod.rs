//! Persistence layer.
//!
//! Typed load/save for every on-disk artifact: ledger index, dated ledgers,
//! per-date audits, the aggregate report, the engine config, and the two
//! tuning inputs. All artifacts are JSON shared with the surrounding system.
//!
//! Writes are atomic per artifact: serialize, write `<file>.tmp`, rename.
//! A crash mid-write never leaves partial JSON behind.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::types::{
    AggregateReport, Audit, EngineConfig, IndexEntry, Ledger, LiveStats, TuningReport,
    TuningResult, VerdictError,
};

const AUDIT_SUFFIX: &str = "-audit.json";

/// Outcome of scanning the audit directory: parsed audits in filename order
/// plus the paths that failed to parse (isolated failures, run continues).
#[derive(Debug, Default)]
pub struct AuditScan {
    pub audits: Vec<Audit>,
    pub failed: Vec<String>,
}

/// File-backed store for every artifact the controller reads or writes.
pub struct FileStore {
    index_file: PathBuf,
    history_dir: PathBuf,
    performance_dir: PathBuf,
    report_file: PathBuf,
    engine_config_file: PathBuf,
    tuning_results_file: PathBuf,
    live_stats_file: PathBuf,
}

impl FileStore {
    pub fn new(cfg: &StoreConfig) -> Self {
        Self {
            index_file: PathBuf::from(&cfg.index_file),
            history_dir: PathBuf::from(&cfg.history_dir),
            performance_dir: PathBuf::from(&cfg.performance_dir),
            report_file: PathBuf::from(&cfg.report_file),
            engine_config_file: PathBuf::from(&cfg.engine_config_file),
            tuning_results_file: PathBuf::from(&cfg.tuning_results_file),
            live_stats_file: PathBuf::from(&cfg.live_stats_file),
        }
    }

    // -- Ledger index ----------------------------------------------------

    /// Load the externally maintained ledger index.
    /// A missing index means nothing has been generated yet — not an error.
    pub fn load_index(&self) -> Result<Vec<IndexEntry>> {
        if !self.index_file.exists() {
            info!(path = %self.index_file.display(), "No ledger index found, nothing to scan");
            return Ok(Vec::new());
        }
        read_json(&self.index_file, "ledger index")
    }

    // -- Ledgers ---------------------------------------------------------

    /// Path of the ledger for a date: `history/<year>/<month>/<day>.json`.
    /// Month and day are unpadded, matching the upstream generator.
    pub fn ledger_path(&self, date: NaiveDate) -> PathBuf {
        self.history_dir
            .join(date.year().to_string())
            .join(date.month().to_string())
            .join(format!("{}.json", date.day()))
    }

    /// Load one dated ledger. Returns `None` if the file does not exist
    /// (referenced by the index but not yet synced — retried next run).
    pub fn load_ledger(&self, date: NaiveDate) -> Result<Option<Ledger>> {
        let path = self.ledger_path(date);
        if !path.exists() {
            debug!(%date, path = %path.display(), "Ledger not yet available");
            return Ok(None);
        }
        let ledger = read_json(&path, "ledger")?;
        Ok(Some(ledger))
    }

    // -- Audits ----------------------------------------------------------

    /// Path of the audit for a date: `performance/<date>-audit.json`.
    pub fn audit_path(&self, date: NaiveDate) -> PathBuf {
        self.performance_dir.join(format!("{date}{AUDIT_SUFFIX}"))
    }

    /// Persist one audit, fully overwriting any prior audit for that date.
    pub fn save_audit(&self, audit: &Audit) -> Result<()> {
        let path = self.audit_path(audit.date);
        write_json_atomic(&path, audit)?;
        debug!(path = %path.display(), %audit, "Audit saved");
        Ok(())
    }

    /// Scan the performance directory for persisted audits.
    ///
    /// Filenames sort chronologically (ISO dates), which fixes the
    /// "original order" the aggregator's stable sort preserves on ties.
    /// A malformed audit file is reported, not fatal.
    pub fn load_audits(&self) -> Result<AuditScan> {
        let mut scan = AuditScan::default();

        if !self.performance_dir.exists() {
            debug!(path = %self.performance_dir.display(), "No audit directory yet");
            return Ok(scan);
        }

        let entries = fs::read_dir(&self.performance_dir).with_context(|| {
            format!(
                "Failed to read audit directory {}",
                self.performance_dir.display()
            )
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(AUDIT_SUFFIX))
            })
            .collect();
        paths.sort();

        for path in paths {
            match read_json::<Audit>(&path, "audit") {
                Ok(audit) => scan.audits.push(audit),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed audit");
                    scan.failed.push(path.display().to_string());
                }
            }
        }

        Ok(scan)
    }

    // -- Aggregate report ------------------------------------------------

    /// Replace the consolidated report wholesale.
    pub fn save_report(&self, report: &AggregateReport) -> Result<()> {
        write_json_atomic(&self.report_file, report)?;
        info!(
            path = %self.report_file.display(),
            audits = report.audits.len(),
            "Aggregate report saved"
        );
        Ok(())
    }

    // -- Engine config ---------------------------------------------------

    /// Load the engine config. Missing or malformed is an error: the
    /// optimizer cannot run without its current thresholds.
    pub fn load_engine_config(&self) -> Result<EngineConfig> {
        if !self.engine_config_file.exists() {
            anyhow::bail!(
                "Engine config not found at {}",
                self.engine_config_file.display()
            );
        }
        read_json(&self.engine_config_file, "engine config")
    }

    /// Persist the engine config, rewriting the file in place.
    pub fn save_engine_config(&self, config: &EngineConfig) -> Result<()> {
        write_json_atomic(&self.engine_config_file, config)?;
        info!(
            path = %self.engine_config_file.display(),
            thresholds = config.thresholds.len(),
            adjustments = config.adjustments.len(),
            "Engine config saved"
        );
        Ok(())
    }

    // -- Tuning inputs ---------------------------------------------------

    /// Load simulated tuning results. `None` if the simulator hasn't
    /// produced output yet — phase 1 is skipped, not failed.
    pub fn load_tuning_results(&self) -> Result<Option<Vec<TuningResult>>> {
        if !self.tuning_results_file.exists() {
            debug!(path = %self.tuning_results_file.display(), "No tuning results available");
            return Ok(None);
        }
        let report: TuningReport = read_json(&self.tuning_results_file, "tuning results")?;
        Ok(Some(report.results))
    }

    /// Load live performance stats. `None` if not yet derived — phase 2 is
    /// skipped, not failed.
    pub fn load_live_stats(&self) -> Result<Option<LiveStats>> {
        if !self.live_stats_file.exists() {
            debug!(path = %self.live_stats_file.display(), "No live stats available");
            return Ok(None);
        }
        let stats = read_json(&self.live_stats_file, "live stats")?;
        Ok(Some(stats))
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(path: &Path, kind: &'static str) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {kind} from {}", path.display()))?;
    let value = serde_json::from_str(&contents).map_err(|e| VerdictError::Parse {
        kind,
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(value)
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| VerdictError::Storage {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
        }
    }

    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialise artifact for {}", path.display()))?;

    let tmp = tmp_path(path);
    fs::write(&tmp, &json).map_err(|e| VerdictError::Storage {
        path: tmp.display().to_string(),
        message: e.to_string(),
    })?;
    fs::rename(&tmp, path).map_err(|e| VerdictError::Storage {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact.json"));
    name.push(".tmp");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
