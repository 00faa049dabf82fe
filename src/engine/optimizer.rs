//! Threshold optimizer.
//!
//! Two-phase control loop over the per-algorithm decision thresholds the
//! external pick generator consumes. Phase 1 nudges thresholds toward the
//! backtest simulator's best-Sharpe candidate in bounded steps — a slow,
//! conservative prior that no single simulation can yank around. Phase 2
//! tightens thresholds whose live win rate has demonstrably slipped — a
//! faster corrective, since realized underperformance outweighs any
//! simulation. Both phases gate on minimum sample sizes, and both run
//! before the config is written once.

use chrono::{DateTime, Utc};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::OptimizerConfig;
use crate::types::{EngineConfig, LiveStats, TuningResult};

/// Applies simulated and live tuning signals to an [`EngineConfig`].
pub struct ThresholdOptimizer {
    params: OptimizerConfig,
}

impl ThresholdOptimizer {
    pub fn new(params: OptimizerConfig) -> Self {
        Self { params }
    }

    /// Run both phases against the shared config.
    ///
    /// Returns whether anything changed; the caller persists the config
    /// exactly once when it did. `lastOptimized` moves only on change, and
    /// adjustments are appended in phase order.
    pub fn optimize(
        &self,
        config: &mut EngineConfig,
        simulated: Option<&[TuningResult]>,
        live: Option<&LiveStats>,
        now: DateTime<Utc>,
    ) -> bool {
        let mut changes = 0;

        if let Some(results) = simulated {
            changes += self.apply_simulation(config, results);
        }
        if let Some(stats) = live {
            changes += self.apply_live(config, stats);
        }

        if changes == 0 {
            debug!("Thresholds unchanged");
            return false;
        }

        config.last_optimized = Some(now);
        info!(changes, "Thresholds retuned");
        true
    }

    // -- Phase 1: simulation guidance ------------------------------------

    /// Nudge each algorithm's threshold toward its simulated optimum.
    ///
    /// Only rows with enough simulated trades count; among those the row
    /// with the highest Sharpe ratio is the optimum. Moves are a fixed step
    /// toward the optimum, never a jump, and only when the gap clears the
    /// minimum-move gate.
    fn apply_simulation(&self, config: &mut EngineConfig, results: &[TuningResult]) -> usize {
        let mut best: BTreeMap<&str, &TuningResult> = BTreeMap::new();
        for row in results {
            if row.total_trades < self.params.min_simulated_trades {
                continue;
            }
            match best.entry(row.algorithm.as_str()) {
                Entry::Vacant(v) => {
                    v.insert(row);
                }
                Entry::Occupied(mut o) => {
                    if row.sharpe_ratio > o.get().sharpe_ratio {
                        o.insert(row);
                    }
                }
            }
        }

        let mut changes = 0;
        for (algo, optimum) in best {
            let Some(current) = config.thresholds.get(algo).copied() else {
                debug!(algorithm = algo, "Not in the tuned set, ignoring simulated rows");
                continue;
            };

            let gap = optimum.threshold - current;
            if gap.abs() < self.params.min_move {
                debug!(
                    algorithm = algo,
                    current,
                    optimum = optimum.threshold,
                    "Within minimum-move band, holding"
                );
                continue;
            }

            let next = current + self.params.simulation_step * gap.signum();
            config.thresholds.insert(algo.to_string(), next);
            config.adjustments.push(format!(
                "{algo}: threshold {current} -> {next} (simulated optimum {} at sharpe {:.2})",
                optimum.threshold, optimum.sharpe_ratio,
            ));
            info!(
                algorithm = algo,
                from = current,
                to = next,
                optimum = optimum.threshold,
                sharpe = optimum.sharpe_ratio,
                "Threshold nudged toward simulated optimum"
            );
            changes += 1;
        }
        changes
    }

    // -- Phase 2: live fine-tuning ---------------------------------------

    /// Tighten thresholds for algorithms whose live win rate has slipped
    /// below the floor, with enough verified picks to trust the signal.
    /// Tightening is capped; an algorithm already at the cap is left alone.
    fn apply_live(&self, config: &mut EngineConfig, live: &LiveStats) -> usize {
        let mut changes = 0;

        for (algo, stats) in &live.by_algorithm {
            if stats.verified < self.params.min_verified {
                debug!(
                    algorithm = %algo,
                    verified = stats.verified,
                    "Too few verified picks to judge live performance"
                );
                continue;
            }
            if stats.win_rate >= self.params.win_rate_floor {
                continue;
            }
            let Some(current) = config.thresholds.get(algo).copied() else {
                debug!(algorithm = %algo, "Not in the tuned set, ignoring live stats");
                continue;
            };

            let next = (current + self.params.tighten_step).min(self.params.threshold_cap);
            if next <= current {
                debug!(algorithm = %algo, current, "Already at cap, holding");
                continue;
            }

            config.thresholds.insert(algo.clone(), next);
            config.adjustments.push(format!(
                "{algo}: threshold {current} -> {next} (live win rate {:.1}% over {} verified)",
                stats.win_rate, stats.verified,
            ));
            info!(
                algorithm = %algo,
                from = current,
                to = next,
                win_rate = stats.win_rate,
                verified = stats.verified,
                "Threshold tightened on live underperformance"
            );
            changes += 1;
        }
        changes
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
