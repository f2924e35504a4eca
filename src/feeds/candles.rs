use crate::models::candle::Candle;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed candle data: {0}")]
    Malformed(String),

    #[error("No candles returned for {symbol}")]
    Empty { symbol: String },
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}

/// Source of historical candles, oldest first.
///
/// `interval` uses exchange notation (`"1m"`, `"1h"`, ...); at most `limit`
/// of the most recent candles are returned.
#[allow(async_fn_in_trait)]
pub trait CandleSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError>;
}

impl<T: CandleSource> CandleSource for &T {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError> {
        (**self).fetch_candles(symbol, interval, limit).await
    }
}
