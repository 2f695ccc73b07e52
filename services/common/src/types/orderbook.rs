//! Order book data model
//!
//! Raw per-exchange ladders, the USD-normalized form, and the aggregated
//! multi-exchange ladder with cumulative depth.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One (price, volume) entry on a single exchange's ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price (must be positive)
    pub price: f64,
    /// Base-asset volume resting at this price
    pub volume: f64,
    /// USD value of this level (`volume * price`), zero until normalized
    #[serde(default)]
    pub volume_usd: f64,
}

impl PriceLevel {
    /// Raw level as received from an exchange, before USD conversion
    #[must_use]
    pub fn raw(price: f64, volume: f64) -> Self {
        Self {
            price,
            volume,
            volume_usd: 0.0,
        }
    }
}

/// Which side(s) of a book an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookSide {
    /// Bid side only
    Bids,
    /// Ask side only
    Asks,
    /// Both sides
    Both,
}

/// A single exchange's order book
///
/// Bids are ordered descending by price, asks ascending; duplicate prices
/// within one side are not expected before aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Bid levels, best first
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best first
    pub asks: Vec<PriceLevel>,
    /// When this book was observed
    pub timestamp: DateTime<Utc>,
}

impl OrderBook {
    /// Empty book with the given timestamp
    #[must_use]
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
            timestamp,
        }
    }

    /// Best bid price, if any
    #[must_use]
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    /// Best ask price, if any
    #[must_use]
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }
}

/// One level of the aggregated multi-exchange ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedLevel {
    /// Exact price shared by all merged contributions
    pub price: f64,
    /// USD volume summed across exchanges at this price
    pub volume_usd: f64,
    /// Running USD total from the best price out to this level
    pub cumulative_usd: f64,
}

/// Top-of-book audit slice for one exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDepth {
    /// Top raw bid levels
    pub bids: Vec<PriceLevel>,
    /// Top raw ask levels
    pub asks: Vec<PriceLevel>,
}

/// Unified order book across exchanges
///
/// `cumulative_usd` is monotonically non-decreasing walking away from the
/// best price on each side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedOrderBook {
    /// Merged bid ladder, best first
    pub bids: Vec<AggregatedLevel>,
    /// Merged ask ladder, best first
    pub asks: Vec<AggregatedLevel>,
    /// Per-exchange top-of-book breakdown for audit/debugging
    pub per_exchange: FxHashMap<String, ExchangeDepth>,
    /// When the aggregation ran
    pub aggregated_at: DateTime<Utc>,
}

impl AggregatedOrderBook {
    /// Empty aggregation result
    #[must_use]
    pub fn empty(aggregated_at: DateTime<Utc>) -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
            per_exchange: FxHashMap::default(),
            aggregated_at,
        }
    }

    /// True when both sides are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Summary metrics for an aggregated book
///
/// `mid_price` falls back to 1.0 (the peg reference) when either side is
/// empty; callers must treat that value as "unknown", not "at peg".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    /// Best bid price (0.0 when the bid side is empty)
    pub best_bid: f64,
    /// Best ask price (0.0 when the ask side is empty)
    pub best_ask: f64,
    /// Mid price, or the 1.0 fallback
    pub mid_price: f64,
    /// Absolute spread
    pub spread: f64,
    /// Spread in basis points of mid
    pub spread_bps: f64,
    /// Total bid-side USD depth
    pub total_bid_usd: f64,
    /// Total ask-side USD depth
    pub total_ask_usd: f64,
}
