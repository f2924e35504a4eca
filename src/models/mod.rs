pub mod candle;
pub mod indicators;
pub mod volatility;
