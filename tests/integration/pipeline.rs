//! End-to-end batch tests: fixture files in, audits/report/config out.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use verdict::config::{OptimizerConfig, StoreConfig, VerifierConfig};
use verdict::engine::optimizer::ThresholdOptimizer;
use verdict::engine::scanner::MaturityScanner;
use verdict::engine::verifier::Verifier;
use verdict::engine::BatchRunner;
use verdict::store::FileStore;

use super::mock_provider::MockProvider;

// ---------------------------------------------------------------------------
// Test environment
// ---------------------------------------------------------------------------

/// A throwaway on-disk store rooted in a unique temp directory.
struct TestEnv {
    root: PathBuf,
    store_cfg: StoreConfig,
}

impl TestEnv {
    fn new() -> Self {
        let mut root = std::env::temp_dir();
        root.push(format!("verdict_test_batch_{}", uuid::Uuid::new_v4()));
        let store_cfg = StoreConfig {
            index_file: root.join("data/picks-index.json").display().to_string(),
            history_dir: root.join("history").display().to_string(),
            performance_dir: root.join("performance").display().to_string(),
            report_file: root.join("performance/report.json").display().to_string(),
            engine_config_file: root.join("data/engine-config.json").display().to_string(),
            tuning_results_file: root.join("data/tuning-results.json").display().to_string(),
            live_stats_file: root.join("performance/live-stats.json").display().to_string(),
        };
        Self { root, store_cfg }
    }

    /// A fresh runner, as each scheduled invocation would build one.
    fn runner(&self, provider: Arc<MockProvider>) -> BatchRunner {
        BatchRunner::new(
            FileStore::new(&self.store_cfg),
            MaturityScanner::new(7),
            Verifier::new(
                provider,
                &VerifierConfig {
                    batch_size: 5,
                    batch_delay_ms: 0,
                },
            ),
            ThresholdOptimizer::new(OptimizerConfig::default()),
        )
    }

    fn write(&self, rel: &str, body: &str) {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn write_ledger(&self, date: NaiveDate, body: &str) {
        let path = FileStore::new(&self.store_cfg).ledger_path(date);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn read_json(&self, rel: &str) -> serde_json::Value {
        let raw = fs::read_to_string(self.root.join(rel)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    fn raw(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).unwrap()
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const EMPTY_ENGINE_CONFIG: &str = r#"{"lastOptimized":null,"thresholds":{},"adjustments":[]}"#;

// ---------------------------------------------------------------------------
// Verification + aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_batch_verifies_and_aggregates() {
    let env = TestEnv::new();
    env.write("data/picks-index.json", r#"[{"date":"2026-07-27"}]"#);
    env.write("data/engine-config.json", EMPTY_ENGINE_CONFIG);
    env.write_ledger(
        date(2026, 7, 27),
        r#"{"picks":[{"symbol":"ABC","algorithm":"ema-cross","timeframe":"7d","price":50.0,"metrics":{"price":50.0}}]}"#,
    );

    let provider = Arc::new(MockProvider::new(&[("ABC", 55.0)]));
    let report = env.runner(provider).run(now()).await;

    assert!(report.succeeded(), "failed units: {:?}", report.failed_units);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.mature_ledgers, 1);
    assert_eq!(report.picks_eligible, 1);
    assert_eq!(report.audits_written, 1);
    assert!(report.report_written);
    assert!(!report.config_updated);

    // The audit lands on disk in the shared camelCase shape.
    let audit = env.read_json("performance/2026-07-27-audit.json");
    assert_eq!(audit["date"], "2026-07-27");
    assert_eq!(audit["totalPicks"], 1);
    assert_eq!(audit["avgReturn"], 10.0);
    assert_eq!(audit["picks"][0]["symbol"], "ABC");
    assert_eq!(audit["picks"][0]["exitPrice"], 55.0);
    assert_eq!(audit["picks"][0]["realizedReturn"], 10.0);
    assert!(audit["picks"][0].get("verifiedAt").is_some());

    // And the consolidated report wraps it.
    let aggregate = env.read_json("performance/report.json");
    assert_eq!(aggregate["audits"].as_array().unwrap().len(), 1);
    assert!(aggregate.get("lastUpdated").is_some());

    // No tuning inputs: the engine config file is untouched.
    assert_eq!(env.raw("data/engine-config.json"), EMPTY_ENGINE_CONFIG);
}

#[tokio::test]
async fn test_rerun_is_idempotent_and_overwrites_in_full() {
    let env = TestEnv::new();
    env.write("data/picks-index.json", r#"[{"date":"2026-07-27"}]"#);
    env.write("data/engine-config.json", EMPTY_ENGINE_CONFIG);
    env.write_ledger(
        date(2026, 7, 27),
        r#"{"picks":[{"symbol":"ABC","algorithm":"ema-cross","timeframe":"7d","price":50.0}]}"#,
    );

    let provider = Arc::new(MockProvider::new(&[("ABC", 55.0)]));
    env.runner(provider.clone()).run(now()).await;
    let first_audits = env.read_json("performance/report.json")["audits"].clone();

    // Same inputs, fresh invocation: identical audits array.
    env.runner(provider.clone()).run(now()).await;
    let second_audits = env.read_json("performance/report.json")["audits"].clone();
    assert_eq!(first_audits, second_audits);

    // Price moved: the date's audit is replaced wholesale, never merged.
    provider.set_price("ABC", 60.0);
    env.runner(provider).run(now()).await;
    let audit = env.read_json("performance/2026-07-27-audit.json");
    assert_eq!(audit["avgReturn"], 20.0);
    assert_eq!(audit["totalPicks"], 1);
}

#[tokio::test]
async fn test_partial_maturity_within_a_ledger() {
    let env = TestEnv::new();
    env.write(
        "data/picks-index.json",
        r#"[{"date":"2026-07-27"},{"date":"2026-08-05"}]"#,
    );
    env.write("data/engine-config.json", EMPTY_ENGINE_CONFIG);
    env.write_ledger(
        date(2026, 7, 27),
        r#"{"picks":[{"symbol":"OLD","algorithm":"ema-cross","timeframe":"7d","price":100.0}]}"#,
    );
    // Yesterday's ledger: the 24h pick matured, the 7d pick did not.
    env.write_ledger(
        date(2026, 8, 5),
        r#"{"picks":[{"symbol":"FAST","algorithm":"momentum","timeframe":"24h","price":10.0},{"symbol":"SLOW","algorithm":"breakout","timeframe":"7d","price":20.0}]}"#,
    );

    let provider = Arc::new(MockProvider::new(&[
        ("OLD", 110.0),
        ("FAST", 11.0),
        ("SLOW", 30.0),
    ]));
    let report = env.runner(provider.clone()).run(now()).await;

    assert!(report.succeeded());
    assert_eq!(report.audits_written, 2);

    let fresh = env.read_json("performance/2026-08-05-audit.json");
    assert_eq!(fresh["totalPicks"], 1);
    assert_eq!(fresh["picks"][0]["symbol"], "FAST");

    // The immature pick was never quoted.
    assert!(!provider.fetches().contains(&"SLOW".to_string()));

    // Newest-first in the aggregate.
    let aggregate = env.read_json("performance/report.json");
    assert_eq!(aggregate["audits"][0]["date"], "2026-08-05");
    assert_eq!(aggregate["audits"][1]["date"], "2026-07-27");
}

#[tokio::test]
async fn test_unavailable_quotes_leave_no_audit() {
    let env = TestEnv::new();
    env.write("data/picks-index.json", r#"[{"date":"2026-07-27"}]"#);
    env.write("data/engine-config.json", EMPTY_ENGINE_CONFIG);
    env.write_ledger(
        date(2026, 7, 27),
        r#"{"picks":[{"symbol":"ABC","algorithm":"ema-cross","timeframe":"7d","price":50.0}]}"#,
    );

    let provider = Arc::new(MockProvider::new(&[]));
    provider.set_failing(true);
    let report = env.runner(provider).run(now()).await;

    // Missing market data is not a failure — the picks wait for the next run.
    assert!(report.succeeded());
    assert_eq!(report.audits_written, 0);
    assert!(!env.exists("performance/2026-07-27-audit.json"));
    assert!(!report.report_written);
    assert!(!env.exists("performance/report.json"));
}

#[tokio::test]
async fn test_missing_ledger_is_skipped_silently() {
    let env = TestEnv::new();
    env.write(
        "data/picks-index.json",
        r#"[{"date":"2026-07-26"},{"date":"2026-07-27"}]"#,
    );
    env.write("data/engine-config.json", EMPTY_ENGINE_CONFIG);
    // Only 07-27 exists on disk; 07-26 is indexed but not yet synced.
    env.write_ledger(
        date(2026, 7, 27),
        r#"{"picks":[{"symbol":"ABC","algorithm":"ema-cross","timeframe":"7d","price":50.0}]}"#,
    );

    let provider = Arc::new(MockProvider::new(&[("ABC", 55.0)]));
    let report = env.runner(provider).run(now()).await;

    assert!(report.succeeded());
    assert_eq!(report.candidates, 2);
    assert_eq!(report.audits_written, 1);
}

#[tokio::test]
async fn test_malformed_ledger_fails_in_isolation() {
    let env = TestEnv::new();
    env.write(
        "data/picks-index.json",
        r#"[{"date":"2026-07-26"},{"date":"2026-07-27"}]"#,
    );
    env.write("data/engine-config.json", EMPTY_ENGINE_CONFIG);
    env.write_ledger(date(2026, 7, 26), "{broken");
    env.write_ledger(
        date(2026, 7, 27),
        r#"{"picks":[{"symbol":"ABC","algorithm":"ema-cross","timeframe":"7d","price":50.0}]}"#,
    );

    let provider = Arc::new(MockProvider::new(&[("ABC", 55.0)]));
    let report = env.runner(provider).run(now()).await;

    // The bad file is reported; the good ledger is still audited.
    assert!(!report.succeeded());
    assert_eq!(report.failed_units, vec!["ledger 2026-07-26".to_string()]);
    assert_eq!(report.audits_written, 1);
    assert!(report.report_written);
}

// ---------------------------------------------------------------------------
// Threshold retuning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_optimizer_end_to_end() {
    let env = TestEnv::new();
    env.write(
        "data/engine-config.json",
        r#"{"lastOptimized":null,"thresholds":{"breakout":70.0,"ema-cross":50.0},"adjustments":[]}"#,
    );
    env.write(
        "data/tuning-results.json",
        r#"{"results":[
            {"algorithm":"ema-cross","threshold":70,"totalTrades":10,"winRate":58.0,"avgReturn":2.1,"sharpeRatio":1.5},
            {"algorithm":"ema-cross","threshold":60,"totalTrades":12,"winRate":52.0,"avgReturn":1.4,"sharpeRatio":0.9},
            {"algorithm":"breakout","threshold":90,"totalTrades":2,"winRate":80.0,"avgReturn":4.0,"sharpeRatio":3.0}
        ]}"#,
    );
    env.write(
        "performance/live-stats.json",
        r#"{"byAlgorithm":{"breakout":{"winRate":30.0,"verified":8}}}"#,
    );

    let provider = Arc::new(MockProvider::new(&[]));
    let report = env.runner(provider).run(now()).await;

    assert!(report.succeeded());
    assert!(report.config_updated);

    let config = env.read_json("data/engine-config.json");
    // Phase 1: nudged one step toward the 10-trade optimum at 70.
    assert_eq!(config["thresholds"]["ema-cross"], 55.0);
    // Phase 1 ignored the 2-trade row; phase 2 tightened on the live slump.
    assert_eq!(config["thresholds"]["breakout"], 75.0);
    assert!(config["lastOptimized"].is_string());

    let adjustments = config["adjustments"].as_array().unwrap();
    assert_eq!(adjustments.len(), 2);
    let first = adjustments[0].as_str().unwrap();
    let second = adjustments[1].as_str().unwrap();
    assert!(first.contains("ema-cross") && first.contains("simulated optimum 70"));
    assert!(second.contains("breakout") && second.contains("live win rate 30.0%"));
}

#[tokio::test]
async fn test_unchanged_config_is_not_rewritten() {
    let env = TestEnv::new();
    let original =
        r#"{"lastOptimized":null,"thresholds":{"ema-cross":50.0},"adjustments":[]}"#;
    env.write("data/engine-config.json", original);
    // Optimum within the minimum-move band: nothing to do.
    env.write(
        "data/tuning-results.json",
        r#"{"results":[{"algorithm":"ema-cross","threshold":53,"totalTrades":10,"winRate":55.0,"avgReturn":1.0,"sharpeRatio":1.2}]}"#,
    );

    let provider = Arc::new(MockProvider::new(&[]));
    let report = env.runner(provider).run(now()).await;

    assert!(report.succeeded());
    assert!(!report.config_updated);
    // Byte-for-byte untouched, lastOptimized still null.
    assert_eq!(env.raw("data/engine-config.json"), original);
}

#[tokio::test]
async fn test_missing_engine_config_is_a_failed_unit() {
    let env = TestEnv::new();
    // No engine config on disk: the optimizer cannot run.
    let provider = Arc::new(MockProvider::new(&[]));
    let report = env.runner(provider).run(now()).await;

    assert!(!report.succeeded());
    assert_eq!(report.failed_units, vec!["engine config".to_string()]);
}
