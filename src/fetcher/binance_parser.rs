//! Binance response parser
//!
//! Stateless conversions from Binance JSON payloads into crate types.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::{Candle, Symbol};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Stateless parser for Binance API responses
pub struct BinanceParser;

impl BinanceParser {
    /// Parse a klines JSON array into candles
    ///
    /// # Format
    /// `[open_time, open, high, low, close, volume, close_time, quote_volume, trades,
    /// taker_buy_base, taker_buy_quote, ignore]`
    ///
    /// # Errors
    /// Returns FetcherError::ParseError if the structure or any field is invalid
    pub fn parse_klines(klines: Vec<Value>) -> FetcherResult<Vec<Candle>> {
        let mut candles = Vec::with_capacity(klines.len());

        for kline in klines {
            let arr = kline
                .as_array()
                .ok_or_else(|| FetcherError::ParseError("Kline is not an array".to_string()))?;

            if arr.len() < 11 {
                return Err(FetcherError::ParseError(format!(
                    "Expected at least 11 elements in kline, got {}",
                    arr.len()
                )));
            }

            let open_time = arr[0]
                .as_i64()
                .ok_or_else(|| FetcherError::ParseError("Invalid open_time".to_string()))?;

            let close_time = arr[6]
                .as_i64()
                .ok_or_else(|| FetcherError::ParseError("Invalid close_time".to_string()))?;

            let trades = arr[8]
                .as_u64()
                .ok_or_else(|| FetcherError::ParseError("Invalid trades count".to_string()))?;

            candles.push(Candle {
                open_time,
                open: Self::parse_decimal(&arr[1], "open")?,
                high: Self::parse_decimal(&arr[2], "high")?,
                low: Self::parse_decimal(&arr[3], "low")?,
                close: Self::parse_decimal(&arr[4], "close")?,
                volume: Self::parse_decimal(&arr[5], "volume")?,
                close_time,
                quote_volume: Self::parse_decimal(&arr[7], "quote_volume")?,
                trades,
                taker_buy_base_volume: Self::parse_decimal(&arr[9], "taker_buy_base_volume")?,
                taker_buy_quote_volume: Self::parse_decimal(&arr[10], "taker_buy_quote_volume")?,
            });
        }

        Ok(candles)
    }

    /// Open time of the first kline in a response
    ///
    /// Used by the `limit=1` probes for the earliest and latest kline of a stream.
    pub fn first_open_time(klines: &[Value]) -> FetcherResult<i64> {
        klines
            .first()
            .and_then(|k| k.as_array())
            .and_then(|arr| arr.first())
            .and_then(|v| v.as_i64())
            .ok_or_else(|| FetcherError::InvalidResponse("Empty klines response".to_string()))
    }

    /// Parse the all-symbol price ticker into the symbol universe
    ///
    /// # Format
    /// `[{"symbol": "ETHBTC", "price": "0.0345"}, ...]`
    pub fn parse_ticker_symbols(tickers: Vec<Value>) -> FetcherResult<Vec<Symbol>> {
        tickers
            .iter()
            .map(|ticker| {
                ticker
                    .get("symbol")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(Symbol::from)
                    .ok_or_else(|| {
                        FetcherError::ParseError("Missing or invalid symbol".to_string())
                    })
            })
            .collect()
    }

    fn parse_decimal(value: &Value, field_name: &str) -> FetcherResult<Decimal> {
        let s = value
            .as_str()
            .ok_or_else(|| FetcherError::ParseError(format!("{field_name} is not a string")))?;

        Decimal::from_str(s)
            .map_err(|e| FetcherError::ParseError(format!("Failed to parse {field_name}: {e}")))
    }
}
