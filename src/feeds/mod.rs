pub mod binance;
pub mod candles;
