use crate::models::candle::Candle;
use crate::models::indicators::{IndicatorBundle, MacdResult, PivotLevels};

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// EMA periods reported by [`IndicatorEngine::calculate_all`].
pub const BUNDLE_EMA_PERIODS: [usize; 4] = [20, 50, 100, 200];

/// Stateless technical indicator calculator.
///
/// Every function is pure over an oldest-first input slice. `None` means the
/// input was too short for the requested period (or the period was zero);
/// callers treat it as "no value yet", not as a failure.
pub struct IndicatorEngine;

impl IndicatorEngine {
    /// Exponential moving average, returning only the latest value.
    ///
    /// Seeded with the SMA of the first `period` values, then
    /// `next = price * k + prev * (1 - k)` with `k = 2 / (period + 1)`.
    pub fn ema(values: &[f64], period: usize) -> Option<f64> {
        Self::ema_series(values, period)?.last().copied()
    }

    /// EMA value after every prefix of `values` that is at least `period` long.
    ///
    /// Element `j` equals `ema(&values[..period + j], period)` bit for bit,
    /// since both perform the same operations in the same order.
    pub fn ema_series(values: &[f64], period: usize) -> Option<Vec<f64>> {
        if period == 0 || values.len() < period {
            return None;
        }
        let k = 2.0 / (period as f64 + 1.0);
        let mut ema = values[..period].iter().sum::<f64>() / period as f64;

        let mut series = Vec::with_capacity(values.len() - period + 1);
        series.push(ema);
        for &price in &values[period..] {
            ema = price * k + ema * (1.0 - k);
            series.push(ema);
        }
        Some(series)
    }

    /// Relative Strength Index over the trailing `period` price changes.
    ///
    /// Gains and losses are plain arithmetic means of the last `period`
    /// changes (no Wilder smoothing). Returns exactly 100 when there were no
    /// losses in that window.
    pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
        if period == 0 || prices.len() < period + 1 {
            return None;
        }
        let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let recent = &changes[changes.len() - period..];

        let avg_gain = recent.iter().map(|&d| if d > 0.0 { d } else { 0.0 }).sum::<f64>() / period as f64;
        let avg_loss = recent.iter().map(|&d| if d < 0.0 { -d } else { 0.0 }).sum::<f64>() / period as f64;

        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }

    pub fn rsi_default(prices: &[f64]) -> Option<f64> {
        Self::rsi(prices, RSI_PERIOD)
    }

    /// MACD line, signal line and histogram.
    ///
    /// The MACD line is `ema(prefix, fast) - ema(prefix, slow)` for every
    /// prefix of length `slow..=len`; the signal line is the EMA of that
    /// sequence. Running EMA series are used instead of recomputing each
    /// prefix, which yields identical values.
    pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdResult> {
        if prices.len() < slow {
            return None;
        }
        let fast_series = Self::ema_series(prices, fast);
        let slow_series = Self::ema_series(prices, slow);

        let at_prefix = |series: &Option<Vec<f64>>, period: usize, len: usize| -> Option<f64> {
            let idx = len.checked_sub(period)?;
            series.as_ref()?.get(idx).copied()
        };

        let macd_values: Vec<f64> = (slow..=prices.len())
            .filter_map(|len| {
                let fast_ema = at_prefix(&fast_series, fast, len)?;
                let slow_ema = at_prefix(&slow_series, slow, len)?;
                Some(fast_ema - slow_ema)
            })
            .collect();

        let signal_line = Self::ema(&macd_values, signal)?;
        let macd = *macd_values.last()?;
        Some(MacdResult {
            macd,
            signal: signal_line,
            histogram: macd - signal_line,
        })
    }

    pub fn macd_default(prices: &[f64]) -> Option<MacdResult> {
        Self::macd(prices, MACD_FAST, MACD_SLOW, MACD_SIGNAL)
    }

    /// Average True Range: EMA of the true ranges of consecutive candle pairs.
    pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
        if period == 0 || candles.len() < period + 1 {
            return None;
        }
        let true_ranges: Vec<f64> = candles
            .windows(2)
            .map(|w| w[1].true_range(Some(w[0].close)))
            .collect();
        Self::ema(&true_ranges, period)
    }

    pub fn atr_default(candles: &[Candle]) -> Option<f64> {
        Self::atr(candles, ATR_PERIOD)
    }

    /// Classic floor pivots.
    pub fn pivot_points(high: f64, low: f64, close: f64) -> PivotLevels {
        let pp = (high + low + close) / 3.0;
        let range = high - low;
        PivotLevels {
            pp,
            r1: 2.0 * pp - low,
            r2: pp + range,
            s1: 2.0 * pp - high,
            s2: pp - range,
        }
    }

    /// Compute the standard indicator bundle in one pass over the inputs.
    ///
    /// Pivots need both `high` and `low` (close is the last price); ATR needs
    /// `candles`. Each field is computed independently of the others.
    pub fn calculate_all(
        prices: &[f64],
        high: Option<f64>,
        low: Option<f64>,
        candles: Option<&[Candle]>,
    ) -> IndicatorBundle {
        let [p20, p50, p100, p200] = BUNDLE_EMA_PERIODS;

        let pivot_points = match (high, low, prices.last()) {
            (Some(h), Some(l), Some(&close)) => Some(Self::pivot_points(h, l, close)),
            _ => None,
        };

        IndicatorBundle {
            ema_20: Self::ema(prices, p20),
            ema_50: Self::ema(prices, p50),
            ema_100: Self::ema(prices, p100),
            ema_200: Self::ema(prices, p200),
            rsi_14: Self::rsi_default(prices),
            macd: Self::macd_default(prices),
            pivot_points,
            atr_14: candles.and_then(Self::atr_default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_prices(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.7).sin() * 3.0)
            .collect()
    }

    fn candles_with_range(n: usize, range: f64) -> Vec<Candle> {
        (0..n)
            .map(|_| Candle::new(100.0, 100.0 + range / 2.0, 100.0 - range / 2.0, 100.0, 1.0))
            .collect()
    }

    #[test]
    fn test_ema_absent_iff_too_short() {
        let prices = trending_prices(30);
        for period in 1..=40 {
            let result = IndicatorEngine::ema(&prices, period);
            assert_eq!(result.is_none(), prices.len() < period, "period={period}");
        }
    }

    #[test]
    fn test_ema_zero_period() {
        assert_eq!(IndicatorEngine::ema(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn test_ema_known_values() {
        // Seed = mean(1,2,3) = 2, k = 0.5 -> 3 -> 4
        let ema = IndicatorEngine::ema(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(ema, 4.0);

        // Exactly `period` values: plain SMA
        let ema = IndicatorEngine::ema(&[2.0, 4.0, 6.0], 3).unwrap();
        assert_eq!(ema, 4.0);
    }

    #[test]
    fn test_ema_constant_series() {
        let prices = vec![64.0; 40];
        for period in [1, 2, 3, 10, 20] {
            assert_eq!(IndicatorEngine::ema(&prices, period), Some(64.0));
        }
    }

    #[test]
    fn test_ema_series_matches_prefix_recompute() {
        let prices = trending_prices(60);
        let series = IndicatorEngine::ema_series(&prices, 12).unwrap();
        assert_eq!(series.len(), 60 - 12 + 1);
        for (j, value) in series.iter().enumerate() {
            let prefix = IndicatorEngine::ema(&prices[..12 + j], 12).unwrap();
            assert_eq!(*value, prefix);
        }
    }

    #[test]
    fn test_rsi_needs_period_plus_one() {
        let prices = trending_prices(14);
        assert!(IndicatorEngine::rsi(&prices, 14).is_none());
        let prices = trending_prices(15);
        assert!(IndicatorEngine::rsi(&prices, 14).is_some());
    }

    #[test]
    fn test_rsi_known_value() {
        // Last two changes: -1, +2 -> avg_gain 1, avg_loss 0.5, RS 2
        let rsi = IndicatorEngine::rsi(&[10.0, 12.0, 11.0, 13.0], 2).unwrap();
        assert!((rsi - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_uses_only_trailing_window() {
        // Heavy losses early on are outside the window of the last 3 changes
        let prices = [100.0, 80.0, 60.0, 61.0, 62.0, 63.0];
        assert_eq!(IndicatorEngine::rsi(&prices, 3), Some(100.0));
    }

    #[test]
    fn test_rsi_no_losses_is_100() {
        let mut prices: Vec<f64> = vec![50.0; 5];
        prices.extend((1..=14).map(|i| 50.0 + i as f64));
        assert_eq!(IndicatorEngine::rsi_default(&prices), Some(100.0));

        // Flat with a single up-tick
        let mut prices = vec![10.0; 14];
        prices.push(11.0);
        assert_eq!(IndicatorEngine::rsi_default(&prices), Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        assert_eq!(IndicatorEngine::rsi_default(&prices), Some(0.0));
    }

    #[test]
    fn test_macd_preconditions() {
        assert!(IndicatorEngine::macd_default(&trending_prices(25)).is_none());
        // 26..=33 gives 8 MACD values, one short of the signal period
        assert!(IndicatorEngine::macd_default(&trending_prices(33)).is_none());
        assert!(IndicatorEngine::macd_default(&trending_prices(34)).is_some());
    }

    #[test]
    fn test_macd_matches_prefix_recompute() {
        let prices = trending_prices(80);
        let result = IndicatorEngine::macd_default(&prices).unwrap();

        let mut macd_values = Vec::new();
        for len in MACD_SLOW..=prices.len() {
            let prefix = &prices[..len];
            if let (Some(f), Some(s)) = (
                IndicatorEngine::ema(prefix, MACD_FAST),
                IndicatorEngine::ema(prefix, MACD_SLOW),
            ) {
                macd_values.push(f - s);
            }
        }
        let signal = IndicatorEngine::ema(&macd_values, MACD_SIGNAL).unwrap();
        let macd = *macd_values.last().unwrap();

        assert_eq!(result.macd, macd);
        assert_eq!(result.signal, signal);
        assert_eq!(result.histogram, macd - signal);
    }

    #[test]
    fn test_macd_histogram_is_difference() {
        for n in [34, 50, 120, 300] {
            let result = IndicatorEngine::macd_default(&trending_prices(n)).unwrap();
            assert!((result.histogram - (result.macd - result.signal)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let prices: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let result = IndicatorEngine::macd_default(&prices).unwrap();
        assert!(result.macd > 0.0);
    }

    #[test]
    fn test_atr_precondition() {
        assert!(IndicatorEngine::atr_default(&candles_with_range(14, 2.0)).is_none());
        assert!(IndicatorEngine::atr_default(&candles_with_range(15, 2.0)).is_some());
    }

    #[test]
    fn test_atr_constant_range() {
        let atr = IndicatorEngine::atr_default(&candles_with_range(50, 2.0)).unwrap();
        assert_eq!(atr, 2.0);
    }

    #[test]
    fn test_atr_non_negative() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let mid = 100.0 + (i as f64 * 0.9).sin() * 10.0;
                let half = 0.5 + (i % 7) as f64 * 0.3;
                Candle::new(mid, mid + half, mid - half, mid + half * 0.2, 1.0)
            })
            .collect();
        let atr = IndicatorEngine::atr_default(&candles).unwrap();
        assert!(atr >= 0.0);
    }

    #[test]
    fn test_atr_includes_gaps() {
        // Zero-range candles that gap by 4 each bar: TR comes entirely from prev close
        let candles: Vec<Candle> = (0..20)
            .map(|i| {
                let p = 100.0 + i as f64 * 4.0;
                Candle::new(p, p, p, p, 1.0)
            })
            .collect();
        assert_eq!(IndicatorEngine::atr_default(&candles), Some(4.0));
    }

    #[test]
    fn test_pivot_points() {
        let pivots = IndicatorEngine::pivot_points(105.0, 95.0, 100.0);
        assert_eq!(
            pivots,
            PivotLevels { pp: 100.0, r1: 105.0, r2: 110.0, s1: 95.0, s2: 90.0 }
        );
    }

    #[test]
    fn test_calculate_all_short_series() {
        let bundle = IndicatorEngine::calculate_all(&trending_prices(10), None, None, None);
        assert_eq!(bundle, IndicatorBundle::default());
    }

    #[test]
    fn test_calculate_all_partial() {
        let prices = trending_prices(60);
        let bundle = IndicatorEngine::calculate_all(&prices, Some(140.0), None, None);
        assert!(bundle.ema_20.is_some());
        assert!(bundle.ema_50.is_some());
        assert!(bundle.ema_100.is_none());
        assert!(bundle.ema_200.is_none());
        assert!(bundle.rsi_14.is_some());
        assert!(bundle.macd.is_some());
        // Low missing -> no pivots
        assert!(bundle.pivot_points.is_none());
        assert!(bundle.atr_14.is_none());
    }

    #[test]
    fn test_calculate_all_full() {
        let prices = trending_prices(250);
        let candles = candles_with_range(30, 2.0);
        let close = *prices.last().unwrap();
        let bundle = IndicatorEngine::calculate_all(&prices, Some(close + 5.0), Some(close - 5.0), Some(&candles));

        assert_eq!(bundle.ema_200, IndicatorEngine::ema(&prices, 200));
        assert_eq!(bundle.rsi_14, IndicatorEngine::rsi(&prices, 14));
        assert_eq!(bundle.macd, IndicatorEngine::macd_default(&prices));
        assert_eq!(bundle.pivot_points, Some(IndicatorEngine::pivot_points(close + 5.0, close - 5.0, close)));
        assert_eq!(bundle.atr_14, Some(2.0));
    }

    #[test]
    fn test_calculate_all_empty_prices_with_candles() {
        let candles = candles_with_range(20, 2.0);
        let bundle = IndicatorEngine::calculate_all(&[], Some(1.0), Some(0.5), Some(&candles));
        assert!(bundle.pivot_points.is_none());
        assert_eq!(bundle.atr_14, Some(2.0));
    }

    #[test]
    fn test_bundle_serializes_absent_fields_as_null() {
        let bundle = IndicatorEngine::calculate_all(&trending_prices(30), None, None, None);
        let value = serde_json::to_value(&bundle).unwrap();
        assert!(value["ema_20"].is_number());
        assert!(value["ema_200"].is_null());
        assert!(value["pivot_points"].is_null());
    }

    #[test]
    fn test_idempotent() {
        let prices = trending_prices(120);
        let candles = candles_with_range(40, 3.0);
        let a = IndicatorEngine::calculate_all(&prices, Some(200.0), Some(90.0), Some(&candles));
        let b = IndicatorEngine::calculate_all(&prices, Some(200.0), Some(90.0), Some(&candles));
        assert_eq!(a, b);
    }
}
