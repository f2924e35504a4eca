use crate::config::BinanceConfig;
use crate::feeds::candles::{CandleSource, FetchError};
use crate::models::candle::Candle;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

const KLINES_PATH: &str = "/fapi/v1/klines";

/// REST client for Binance futures klines.
pub struct BinanceKlineClient {
    config: BinanceConfig,
    http: reqwest::Client,
}

impl BinanceKlineClient {
    pub fn new(config: BinanceConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Some(std::time::Duration::from_secs(30)))
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    fn klines_url(&self) -> String {
        format!("{}{}", self.config.rest_url.trim_end_matches('/'), KLINES_PATH)
    }

    /// Parse a klines response body.
    ///
    /// Each row is `[open_time, open, high, low, close, volume, close_time,
    /// quote_volume, trades, ...]` with prices as decimal strings. One bad
    /// row rejects the whole payload.
    pub fn parse_klines(body: &str) -> Result<Vec<Candle>, FetchError> {
        let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
        rows.iter()
            .enumerate()
            .map(|(i, row)| Self::parse_row(row).map_err(|e| FetchError::Malformed(format!("row {i}: {e}"))))
            .collect()
    }

    fn parse_row(row: &[Value]) -> Result<Candle, String> {
        if row.len() < 9 {
            return Err(format!("expected at least 9 fields, got {}", row.len()));
        }
        Ok(Candle {
            open_time: millis_field(row, 0)?,
            open: float_field(row, 1)?,
            high: float_field(row, 2)?,
            low: float_field(row, 3)?,
            close: float_field(row, 4)?,
            volume: float_field(row, 5)?,
            close_time: millis_field(row, 6)?,
            trades: row[8].as_u64().ok_or("trades is not an integer")?,
        })
    }
}

fn float_field(row: &[Value], idx: usize) -> Result<f64, String> {
    let value: f64 = match &row[idx] {
        Value::String(s) => s.parse().map_err(|_| format!("field {idx} is not numeric: {s:?}"))?,
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("field {idx} out of range"))?,
        other => return Err(format!("field {idx} has unexpected type: {other}")),
    };
    // "NaN" and "inf" parse as f64 but are never valid prices
    if !value.is_finite() {
        return Err(format!("field {idx} is not finite: {value}"));
    }
    Ok(value)
}

fn millis_field(row: &[Value], idx: usize) -> Result<DateTime<Utc>, String> {
    row[idx]
        .as_i64()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| format!("field {idx} is not a millisecond timestamp"))
}

impl CandleSource for BinanceKlineClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError> {
        let symbol = symbol.to_uppercase();
        let limit = limit.to_string();

        let resp = self
            .http
            .get(self.klines_url())
            .query(&[
                ("symbol", symbol.as_str()),
                ("interval", interval),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let candles = Self::parse_klines(&body)?;
        if candles.is_empty() {
            return Err(FetchError::Empty { symbol });
        }
        debug!("Fetched {} {interval} candles for {symbol}", candles.len());
        Ok(candles)
    }
}
