//! 🧭 Risk Monitor - daily market-risk report
//!
//! Meant to be triggered once a day by an external scheduler (cron, CI job).
//! Exit code 0 on success or when the day was already recorded; non-zero on
//! any unrecoverable failure, after a best-effort error notification.

use anyhow::{Context, Result};
use log::info;

use risk_monitor::{Config, RiskMonitor, RunOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env) before the logger so LOG_LEVEL applies
    let config = Config::from_env();
    let default_level = config
        .as_ref()
        .map(|c| c.logging.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = config.context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!("✅ Configuration: Loaded");

    let monitor = RiskMonitor::from_config(&config).context("Failed to initialise risk monitor")?;

    match monitor.run().await {
        Ok(RunOutcome::Recorded { result, notified }) => {
            info!(
                "✅ Run complete: level {} (score {}), notification {}",
                result.level.as_u8(),
                result.score,
                if notified { "sent" } else { "not delivered" }
            );
            Ok(())
        }
        Ok(RunOutcome::AlreadyRecorded) => {
            info!("✅ Today already executed. Skip.");
            Ok(())
        }
        Err(e) => {
            monitor.report_failure(&e).await;
            Err(e.into())
        }
    }
}
