//! VERDICT — adaptive feedback controller for recommendation picks.
//!
//! Entry point. Loads configuration, initialises structured logging, and
//! runs one verification batch: scan matured ledgers, verify outcomes,
//! rebuild the aggregate report, retune thresholds. Designed for scheduled
//! invocations — one batch per process, non-zero exit when any unit failed.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use verdict::config;
use verdict::engine::optimizer::ThresholdOptimizer;
use verdict::engine::scanner::MaturityScanner;
use verdict::engine::verifier::Verifier;
use verdict::engine::BatchRunner;
use verdict::market::finnhub::FinnhubProvider;
use verdict::market::MarketDataProvider;
use verdict::store::FileStore;
use verdict::types::VerdictError;

const BANNER: &str = r#"
__     _______ ____  ____ ___ ____ _____
\ \   / / ____|  _ \|  _ \_ _/ ___|_   _|
 \ \ / /|  _| | |_) | | | | | |     | |
  \ V / | |___|  _ <| |_| | | |___  | |
   \_/  |_____|_| \_\____/___\____| |_|

  Verified Engine Retuning from Drift In Closed-loop Tracking
  v0.1.0 — Feedback Controller
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging(&cfg);

    // Print startup banner
    println!("{BANNER}");
    info!(
        provider = %cfg.market_data.provider,
        history_dir = %cfg.store.history_dir,
        performance_dir = %cfg.store.performance_dir,
        "VERDICT starting up"
    );

    // -- Initialise components -------------------------------------------

    let store = FileStore::new(&cfg.store);

    let provider: Arc<dyn MarketDataProvider> = match cfg.market_data.provider.as_str() {
        "finnhub" => {
            let api_key = std::env::var(&cfg.market_data.api_key_env).unwrap_or_default();
            if api_key.is_empty() {
                warn!(
                    env = %cfg.market_data.api_key_env,
                    "No market data API key configured — quotes will fail and picks stay unverified"
                );
            }
            Arc::new(FinnhubProvider::new(api_key, cfg.market_data.timeout_secs)?)
        }
        other => {
            return Err(
                VerdictError::Config(format!("Unknown market data provider: {other}")).into(),
            );
        }
    };

    let runner = BatchRunner::new(
        store,
        MaturityScanner::new(cfg.scanner.default_timeframe_days),
        Verifier::new(provider, &cfg.verifier),
        ThresholdOptimizer::new(cfg.optimizer.clone()),
    );

    // -- Run one batch ---------------------------------------------------

    let report = runner.run(Utc::now()).await;

    if !report.succeeded() {
        error!(
            run_id = %report.run_id,
            failed = ?report.failed_units,
            "Batch finished with failed units"
        );
        std::process::exit(1);
    }

    info!(run_id = %report.run_id, "VERDICT finished cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging(cfg: &config::AppConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("verdict=info"));

    let json_logging = std::env::var("VERDICT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }

    let _ = cfg;
}
