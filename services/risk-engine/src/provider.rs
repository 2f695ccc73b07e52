//! Consumed upstream data interface
//!
//! Implemented outside this workspace (exchange clients, data vendors).
//! Each call signals unavailability through `Err` so the engine can apply
//! its documented fallback instead of silently substituting an estimate.

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use services_common::{ExchangeQuote, MarketError, OhlcvCandle, OrderBook};

/// Live market data source
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Raw order book for one exchange
    async fn orderbook(&self, exchange: &str, symbol: &str) -> Result<OrderBook, MarketError>;

    /// OHLCV history, oldest first
    async fn ohlcv(
        &self,
        symbol: &str,
        period_minutes: u32,
        limit: usize,
    ) -> Result<Vec<OhlcvCandle>, MarketError>;

    /// Latest price per exchange
    async fn exchange_prices(
        &self,
        symbol: &str,
        exchanges: &[String],
    ) -> Result<FxHashMap<String, ExchangeQuote>, MarketError>;
}
