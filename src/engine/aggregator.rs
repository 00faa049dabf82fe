//! Performance aggregator.
//!
//! Merges every persisted audit into the single consolidated report the
//! presentation layer renders. Pure and total over the current audit set:
//! rerunning with the same audits yields the same report, only the
//! `lastUpdated` stamp moves.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::types::{AggregateReport, Audit};

/// Build the consolidated report: audits sorted newest-first, ties keeping
/// their incoming order. An empty audit set produces no report — there is
/// nothing to publish yet.
pub fn aggregate(mut audits: Vec<Audit>, now: DateTime<Utc>) -> Option<AggregateReport> {
    if audits.is_empty() {
        info!("No audits persisted yet, skipping aggregate report");
        return None;
    }

    // Stable sort: equal dates keep the order the store handed them in.
    audits.sort_by(|a, b| b.date.cmp(&a.date));

    info!(
        audits = audits.len(),
        newest = %audits[0].date,
        oldest = %audits[audits.len() - 1].date,
        "Aggregate report assembled"
    );

    Some(AggregateReport {
        audits,
        last_updated: now,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
