use crate::models::volatility::Thresholds;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub binance: BinanceConfig,
    pub volatility: VolatilityConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    pub rest_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityConfig {
    /// Symbols classified on every cycle, e.g. "BTCUSDT".
    pub assets: Vec<String>,
    pub thresholds: Thresholds,
    pub candle_interval: String, // exchange notation, e.g. "1h"
    pub candle_limit: usize,
    pub atr_period: usize,
    pub max_concurrent_fetches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_url: "https://fapi.binance.com".into(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            assets: vec![
                "BTCUSDT".into(),
                "ETHUSDT".into(),
                "SOLUSDT".into(),
                "XRPUSDT".into(),
            ],
            thresholds: Thresholds::default(),
            candle_interval: "1h".into(),
            candle_limit: 150,
            atr_period: 14,
            max_concurrent_fetches: 4,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            json_logs: false,
        }
    }
}

/// Parse an env var, keeping `current` when it is unset or unparseable.
fn env_or<T: FromStr>(key: &str, current: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Ignoring unparseable {key}={raw:?}");
                current
            }
        },
        Err(_) => current,
    }
}

/// Split a comma-separated symbol list, dropping blanks.
pub fn parse_asset_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables (.env file) with defaults.
    ///
    /// Optional env vars:
    ///   BINANCE_REST_URL, BINANCE_TIMEOUT_SECS
    ///   VOLATILITY_ASSETS: comma-separated symbols (default: BTC/ETH/SOL/XRP USDT)
    ///   VOLATILITY_THRESHOLD_VERY_HIGH / _HIGH / _MEDIUM: ATR fraction of price
    ///   VOLATILITY_CANDLE_INTERVAL, VOLATILITY_CANDLE_LIMIT, VOLATILITY_MAX_CONCURRENT
    ///   LOG_LEVEL: default log filter (default: info); RUST_LOG overrides it at
    ///              subscriber init
    ///   LOG_FORMAT: "json" for structured output
    pub fn load_or_default() -> Self {
        let _ = dotenv::dotenv();

        let mut config = Self::default();

        if let Ok(url) = std::env::var("BINANCE_REST_URL") {
            if !url.is_empty() {
                config.binance.rest_url = url;
            }
        }
        config.binance.request_timeout_secs =
            env_or("BINANCE_TIMEOUT_SECS", config.binance.request_timeout_secs);

        let vol = &mut config.volatility;
        if let Ok(raw) = std::env::var("VOLATILITY_ASSETS") {
            let assets = parse_asset_list(&raw);
            if !assets.is_empty() {
                vol.assets = assets;
            }
        }
        vol.thresholds.very_high = env_or("VOLATILITY_THRESHOLD_VERY_HIGH", vol.thresholds.very_high);
        vol.thresholds.high = env_or("VOLATILITY_THRESHOLD_HIGH", vol.thresholds.high);
        vol.thresholds.medium = env_or("VOLATILITY_THRESHOLD_MEDIUM", vol.thresholds.medium);
        if let Ok(interval) = std::env::var("VOLATILITY_CANDLE_INTERVAL") {
            if !interval.is_empty() {
                vol.candle_interval = interval;
            }
        }
        vol.candle_limit = env_or("VOLATILITY_CANDLE_LIMIT", vol.candle_limit);
        vol.max_concurrent_fetches = env_or("VOLATILITY_MAX_CONCURRENT", vol.max_concurrent_fetches);

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if !level.is_empty() {
                config.telemetry.log_level = level;
            }
        }
        config.telemetry.json_logs = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        config
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let vol = &self.volatility;
        anyhow::ensure!(!vol.assets.is_empty(), "At least one asset must be configured");
        anyhow::ensure!(vol.atr_period > 0, "atr_period must be positive");
        anyhow::ensure!(
            vol.candle_limit > vol.atr_period,
            "candle_limit ({}) must exceed atr_period ({}) for ATR to be computable",
            vol.candle_limit,
            vol.atr_period
        );
        anyhow::ensure!(vol.max_concurrent_fetches > 0, "max_concurrent_fetches must be positive");

        let t = &vol.thresholds;
        anyhow::ensure!(
            t.very_high > 0.0 && t.high > 0.0 && t.medium > 0.0,
            "Volatility thresholds must be positive, got {t:?}"
        );
        if !t.is_ordered() {
            // Classification still works; the first matching cutoff wins.
            tracing::warn!(
                "Volatility thresholds are not ordered very_high >= high >= medium: {:?}",
                t
            );
        }
        anyhow::ensure!(self.binance.request_timeout_secs > 0, "request timeout must be positive");
        Ok(())
    }
}
