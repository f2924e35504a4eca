use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete volatility level. Declaration order gives the urgency ordering
/// `VeryHigh > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl VolatilityLevel {
    pub const ALL: [VolatilityLevel; 4] = [
        VolatilityLevel::VeryHigh,
        VolatilityLevel::High,
        VolatilityLevel::Medium,
        VolatilityLevel::Low,
    ];

    /// Trading-cycle interval bound to this level.
    pub fn interval_minutes(&self) -> u32 {
        match self {
            VolatilityLevel::VeryHigh => 3,
            VolatilityLevel::High => 6,
            VolatilityLevel::Medium => 12,
            VolatilityLevel::Low => 25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityLevel::VeryHigh => "very_high",
            VolatilityLevel::High => "high",
            VolatilityLevel::Medium => "medium",
            VolatilityLevel::Low => "low",
        }
    }
}

impl fmt::Display for VolatilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Minimum ATR-as-fraction-of-price cutoffs, checked from the most urgent down.
///
/// Expected to satisfy `very_high >= high >= medium > 0`. This is not
/// enforced here: with a mis-ordered set the first matching cutoff in
/// evaluation order still wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub very_high: f64,
    pub high: f64,
    pub medium: f64,
}

impl Thresholds {
    pub fn is_ordered(&self) -> bool {
        self.very_high >= self.high && self.high >= self.medium && self.medium > 0.0
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            very_high: 0.03,
            high: 0.02,
            medium: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityResult {
    pub level: VolatilityLevel,
    pub interval_minutes: u32,
    pub atr_value: Option<f64>,
    pub atr_percentage: Option<f64>,
}

impl VolatilityResult {
    pub fn new(level: VolatilityLevel, atr_value: f64, atr_percentage: f64) -> Self {
        Self {
            level,
            interval_minutes: level.interval_minutes(),
            atr_value: Some(atr_value),
            atr_percentage: Some(atr_percentage),
        }
    }

    /// Medium level with no ATR data, used whenever inputs are missing or unusable.
    pub fn fallback() -> Self {
        Self {
            level: VolatilityLevel::Medium,
            interval_minutes: VolatilityLevel::Medium.interval_minutes(),
            atr_value: None,
            atr_percentage: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.atr_value.is_none()
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }

    /// When the next trading cycle should run if the previous one finished at `from`.
    pub fn next_run_after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + chrono::Duration::minutes(i64::from(self.interval_minutes))
    }
}

impl Default for VolatilityResult {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Classification of one configured asset, kept for display alongside the
/// portfolio-wide decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetVolatility {
    pub symbol: String,
    pub result: VolatilityResult,
}
