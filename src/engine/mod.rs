//! Core engine — the scan → verify → aggregate → retune batch.
//!
//! One sequential batch per invocation. Every unit of work (one ledger's
//! audit, the aggregate report, the engine config write) fails in isolation:
//! its name lands in the run report, the batch moves on, and the process
//! exit code reflects whether anything failed.

pub mod aggregator;
pub mod optimizer;
pub mod scanner;
pub mod verifier;

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::optimizer::ThresholdOptimizer;
use crate::engine::scanner::MaturityScanner;
use crate::engine::verifier::Verifier;
use crate::store::FileStore;

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// Summary of one complete batch.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Index entries old enough to be verification candidates.
    pub candidates: usize,
    /// Ledgers with at least one matured pick.
    pub mature_ledgers: usize,
    pub picks_eligible: usize,
    pub audits_written: usize,
    pub report_written: bool,
    pub config_updated: bool,
    /// Names of work units that failed; empty means a clean run.
    pub failed_units: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            candidates: 0,
            mature_ledgers: 0,
            picks_eligible: 0,
            audits_written: 0,
            report_written: false,
            config_updated: false,
            failed_units: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failed_units.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Batch runner
// ---------------------------------------------------------------------------

/// Ties the scanner, verifier, aggregator, and optimizer into one batch
/// over a shared file store.
pub struct BatchRunner {
    store: FileStore,
    scanner: MaturityScanner,
    verifier: Verifier,
    optimizer: ThresholdOptimizer,
}

impl BatchRunner {
    pub fn new(
        store: FileStore,
        scanner: MaturityScanner,
        verifier: Verifier,
        optimizer: ThresholdOptimizer,
    ) -> Self {
        Self {
            store,
            scanner,
            verifier,
            optimizer,
        }
    }

    /// Run one batch: verify matured ledgers, rebuild the aggregate report,
    /// then retune thresholds. `now` fixes maturity and every timestamp the
    /// batch writes.
    pub async fn run(&self, now: DateTime<Utc>) -> RunReport {
        let run_id = Uuid::new_v4();
        let mut report = RunReport::new(run_id);
        info!(%run_id, "Starting batch");

        self.verify_ledgers(now, &mut report).await;
        self.aggregate_audits(now, &mut report);
        self.retune_thresholds(now, &mut report);

        report.finished_at = Utc::now();
        info!(
            %run_id,
            candidates = report.candidates,
            mature_ledgers = report.mature_ledgers,
            picks_eligible = report.picks_eligible,
            audits_written = report.audits_written,
            report_written = report.report_written,
            config_updated = report.config_updated,
            failed_units = report.failed_units.len(),
            "Batch complete"
        );
        report
    }

    // -- Stage 1: scan + verify ------------------------------------------

    async fn verify_ledgers(&self, now: DateTime<Utc>, report: &mut RunReport) {
        let index = match self.store.load_index() {
            Ok(index) => index,
            Err(e) => {
                error!(error = %e, "Ledger index unreadable — nothing verified this run");
                report.failed_units.push("ledger index".to_string());
                return;
            }
        };
        if index.is_empty() {
            return;
        }

        let outcome = self.scanner.scan(&self.store, &index, now);
        report.candidates = outcome.candidates;
        report.mature_ledgers = outcome.batches.len();
        report.failed_units.extend(outcome.failed);

        for batch in outcome.batches {
            report.picks_eligible += batch.picks.len();

            let Some(audit) = self.verifier.verify(batch.date, &batch.picks, now).await else {
                continue;
            };
            match self.store.save_audit(&audit) {
                Ok(()) => report.audits_written += 1,
                Err(e) => {
                    error!(date = %batch.date, error = %e, "Failed to persist audit");
                    report.failed_units.push(format!("audit {}", batch.date));
                }
            }
        }
    }

    // -- Stage 2: aggregate ----------------------------------------------

    fn aggregate_audits(&self, now: DateTime<Utc>, report: &mut RunReport) {
        let scan = match self.store.load_audits() {
            Ok(scan) => scan,
            Err(e) => {
                error!(error = %e, "Audit store unreadable — aggregate report not rebuilt");
                report.failed_units.push("audit store".to_string());
                return;
            }
        };
        report
            .failed_units
            .extend(scan.failed.iter().map(|p| format!("audit file {p}")));

        let Some(aggregate) = aggregator::aggregate(scan.audits, now) else {
            return;
        };
        match self.store.save_report(&aggregate) {
            Ok(()) => report.report_written = true,
            Err(e) => {
                error!(error = %e, "Failed to persist aggregate report");
                report.failed_units.push("aggregate report".to_string());
            }
        }
    }

    // -- Stage 3: retune -------------------------------------------------

    fn retune_thresholds(&self, now: DateTime<Utc>, report: &mut RunReport) {
        let mut config = match self.store.load_engine_config() {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "Engine config unavailable — optimizer skipped");
                report.failed_units.push("engine config".to_string());
                return;
            }
        };

        let simulated = match self.store.load_tuning_results() {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "Tuning results unreadable — simulation phase skipped");
                report.failed_units.push("tuning results".to_string());
                None
            }
        };
        let live = match self.store.load_live_stats() {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Live stats unreadable — live phase skipped");
                report.failed_units.push("live stats".to_string());
                None
            }
        };

        // Both phases evaluate before the single config write.
        if !self
            .optimizer
            .optimize(&mut config, simulated.as_deref(), live.as_ref(), now)
        {
            return;
        }

        match self.store.save_engine_config(&config) {
            Ok(()) => report.config_updated = true,
            Err(e) => {
                error!(error = %e, "Failed to persist engine config");
                report.failed_units.push("engine config write".to_string());
            }
        }
    }
}
