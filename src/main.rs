//! Volatility pacer.
//!
//! Classifies every configured asset from hourly ATR, picks the most urgent
//! level and reports when the next trading cycle should run. Loops on that
//! interval until Ctrl-C.
//!
//! Usage:  cargo run -- [--once]

use cyclepace::config::Config;
use cyclepace::feeds::binance::BinanceKlineClient;
use cyclepace::signals::volatility::{VolatilityClassifier, VolatilityMonitor};
use cyclepace::telemetry::logging::init_tracing;

use chrono::Utc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_or_default();
    init_tracing(&config.telemetry)?;

    if let Err(e) = config.validate() {
        error!("Config validation failed: {e}");
        return Err(e);
    }

    let run_once = std::env::args().skip(1).any(|a| a == "--once");

    info!("--- Volatility pacing ---");
    info!("  Assets:      {}", config.volatility.assets.join(", "));
    info!(
        "  Candles:     {} x {} (ATR {})",
        config.volatility.candle_limit, config.volatility.candle_interval, config.volatility.atr_period
    );
    info!(
        "  Thresholds:  very_high={} high={} medium={}",
        config.volatility.thresholds.very_high,
        config.volatility.thresholds.high,
        config.volatility.thresholds.medium
    );

    let client = BinanceKlineClient::new(config.binance.clone())?;
    let monitor = VolatilityMonitor::new(client, config.volatility.clone());

    loop {
        let started = Utc::now();
        let per_asset = monitor.classify_each().await;
        for asset in &per_asset {
            let pct = asset
                .result
                .atr_percentage
                .map(|p| format!("{:.3}%", p * 100.0))
                .unwrap_or_else(|| "n/a".into());
            info!(
                "  {:<10} {:<9} atr/price={pct} interval={}m",
                asset.symbol, asset.result.level, asset.result.interval_minutes
            );
        }

        let decision = VolatilityClassifier::most_urgent(per_asset.iter().map(|a| a.result));
        let next_run = decision.next_run_after(started);
        info!(
            "Volatility {}: next trading cycle at {} ({}m)",
            decision.level,
            next_run.format("%H:%M:%S UTC"),
            decision.interval_minutes
        );

        if run_once {
            let report = serde_json::json!({
                "decision": decision,
                "next_run_at": next_run,
                "assets": per_asset,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(decision.interval()) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}
