pub mod indicators;
pub mod volatility;
