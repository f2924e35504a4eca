use crate::config::VolatilityConfig;
use crate::feeds::candles::CandleSource;
use crate::models::volatility::{AssetVolatility, Thresholds, VolatilityLevel, VolatilityResult};
use crate::signals::indicators::IndicatorEngine;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Maps ATR relative to price onto a [`VolatilityLevel`] and its cycle interval.
pub struct VolatilityClassifier;

impl VolatilityClassifier {
    /// Classify a raw ATR reading against the current price.
    ///
    /// Missing or non-finite ATR or price, and a zero price, all yield the
    /// Medium fallback. Cutoffs are checked from `very_high` down and the first
    /// match wins, so a value sitting exactly on a cutoff takes the more
    /// urgent level.
    pub fn classify(
        atr_value: Option<f64>,
        current_price: Option<f64>,
        thresholds: &Thresholds,
    ) -> VolatilityResult {
        let (atr, price) = match (atr_value, current_price) {
            (Some(atr), Some(price)) if atr.is_finite() && price.is_finite() && price != 0.0 => {
                (atr, price)
            }
            _ => return VolatilityResult::fallback(),
        };

        let atr_pct = atr / price;
        let level = match atr_pct {
            x if x >= thresholds.very_high => VolatilityLevel::VeryHigh,
            x if x >= thresholds.high => VolatilityLevel::High,
            x if x >= thresholds.medium => VolatilityLevel::Medium,
            _ => VolatilityLevel::Low,
        };
        VolatilityResult::new(level, atr, atr_pct)
    }

    pub fn classify_default(atr_value: Option<f64>, current_price: Option<f64>) -> VolatilityResult {
        Self::classify(atr_value, current_price, &Thresholds::default())
    }

    /// Pick the result with the shortest interval. Ties keep the earliest;
    /// an empty input gives the Medium fallback.
    pub fn most_urgent<I>(results: I) -> VolatilityResult
    where
        I: IntoIterator<Item = VolatilityResult>,
    {
        results
            .into_iter()
            .min_by_key(|r| r.interval_minutes)
            .unwrap_or_else(VolatilityResult::fallback)
    }
}

/// Classifies configured assets from freshly fetched candles.
pub struct VolatilityMonitor<S> {
    source: S,
    config: VolatilityConfig,
}

impl<S: CandleSource> VolatilityMonitor<S> {
    pub fn new(source: S, config: VolatilityConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &VolatilityConfig {
        &self.config
    }

    /// Classify one symbol from its recent candles.
    ///
    /// Never fails: fetch errors and empty histories are logged and
    /// reported as the Medium fallback.
    pub async fn classify_for_symbol(&self, symbol: &str) -> VolatilityResult {
        let fetched = self
            .source
            .fetch_candles(symbol, &self.config.candle_interval, self.config.candle_limit)
            .await;

        let candles = match fetched {
            Ok(candles) => candles,
            Err(e) => {
                warn!("Volatility fetch failed for {symbol}: {e}; using medium default");
                return VolatilityResult::fallback();
            }
        };
        let Some(last) = candles.last() else {
            warn!("No candles returned for {symbol}; using medium default");
            return VolatilityResult::fallback();
        };

        let atr = IndicatorEngine::atr(&candles, self.config.atr_period);
        if atr.is_none() {
            debug!(
                "Only {} candles for {symbol}, ATR({}) unavailable",
                candles.len(),
                self.config.atr_period
            );
        }

        let result = VolatilityClassifier::classify(atr, Some(last.close), &self.config.thresholds);
        debug!(
            "{symbol}: level={} interval={}m atr={:?} atr_pct={:?}",
            result.level, result.interval_minutes, result.atr_value, result.atr_percentage
        );
        result
    }

    /// Classify every configured asset, in configuration order.
    ///
    /// Fetches run concurrently, at most `max_concurrent_fetches` at a time.
    pub async fn classify_each(&self) -> Vec<AssetVolatility> {
        let limit = self.config.max_concurrent_fetches.max(1);
        stream::iter(self.config.assets.iter())
            .map(|symbol| async move {
                AssetVolatility {
                    symbol: symbol.clone(),
                    result: self.classify_for_symbol(symbol).await,
                }
            })
            .buffered(limit)
            .collect()
            .await
    }

    /// Portfolio-wide decision: the most urgent per-asset result.
    pub async fn classify_all_assets(&self) -> VolatilityResult {
        let per_asset = self.classify_each().await;
        let result = VolatilityClassifier::most_urgent(per_asset.iter().map(|a| a.result));

        let driver = per_asset
            .iter()
            .find(|a| a.result == result)
            .map(|a| a.symbol.as_str())
            .unwrap_or("none");
        info!(
            "Volatility {} across {} assets (driven by {driver}): next cycle in {}m",
            result.level,
            per_asset.len(),
            result.interval_minutes
        );
        result
    }
}
