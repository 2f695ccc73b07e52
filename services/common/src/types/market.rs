//! OHLCV and multi-exchange price types

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::orderbook::AggregatedOrderBook;

/// One OHLCV candle, nominally a 1-minute bucket
///
/// Consumers assume candles are ordered ascending by `period_start`; gaps
/// degrade feature quality silently rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvCandle {
    /// Bucket start time
    pub period_start: DateTime<Utc>,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume traded during the bucket
    pub volume_traded: f64,
}

/// Latest price reported by one exchange
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeQuote {
    /// Last price
    pub price: f64,
    /// When the exchange reported it
    pub timestamp: DateTime<Utc>,
}

/// Everything the feature pipeline needs for one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Asset symbol (e.g. "usdt")
    pub symbol: String,
    /// Current reference price
    pub price: f64,
    /// Aggregated multi-exchange order book
    pub book: AggregatedOrderBook,
    /// OHLCV history, oldest first
    pub candles: Vec<OhlcvCandle>,
    /// Latest price per exchange
    pub exchange_prices: FxHashMap<String, ExchangeQuote>,
}
