//! Unit tests for the risk engine against mock upstream providers

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use anomaly_detector::Severity;
use deviation_monitor::{PriceHistoryProvider, PricePoint};
use risk_engine::{MarketDataProvider, RiskEngine};
use services_common::{
    EngineConfig, ExchangeQuote, MarketError, OhlcvCandle, OrderBook,
};
use test_utils::{assert_close, crisis_anomaly_features, exchange_books, raw_book};

/// Healthy upstream: tight books, flat candles, aligned prices
struct HealthyMarket;

#[async_trait]
impl MarketDataProvider for HealthyMarket {
    async fn orderbook(&self, _exchange: &str, _symbol: &str) -> Result<OrderBook, MarketError> {
        Ok(raw_book(
            &[(0.999, 2_000_000.0), (0.998, 1_000_000.0)],
            &[(1.001, 2_000_000.0), (1.002, 1_000_000.0)],
        ))
    }

    async fn ohlcv(
        &self,
        _symbol: &str,
        _period_minutes: u32,
        limit: usize,
    ) -> Result<Vec<OhlcvCandle>, MarketError> {
        let n = limit.min(120);
        let start = Utc::now() - Duration::minutes(n as i64);
        Ok((0..n)
            .map(|i| OhlcvCandle {
                period_start: start + Duration::minutes(i as i64),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume_traded: 50_000.0,
            })
            .collect())
    }

    async fn exchange_prices(
        &self,
        _symbol: &str,
        exchanges: &[String],
    ) -> Result<FxHashMap<String, ExchangeQuote>, MarketError> {
        Ok(exchanges
            .iter()
            .map(|exchange| {
                (
                    exchange.clone(),
                    ExchangeQuote {
                        price: 1.0,
                        timestamp: Utc::now(),
                    },
                )
            })
            .collect())
    }
}

/// Upstream where only the OHLCV feed is down
struct CandlesDown;

#[async_trait]
impl MarketDataProvider for CandlesDown {
    async fn orderbook(&self, exchange: &str, symbol: &str) -> Result<OrderBook, MarketError> {
        HealthyMarket.orderbook(exchange, symbol).await
    }

    async fn ohlcv(
        &self,
        _symbol: &str,
        _period_minutes: u32,
        _limit: usize,
    ) -> Result<Vec<OhlcvCandle>, MarketError> {
        Err(MarketError::DataUnavailable("candle feed down".to_string()))
    }

    async fn exchange_prices(
        &self,
        symbol: &str,
        exchanges: &[String],
    ) -> Result<FxHashMap<String, ExchangeQuote>, MarketError> {
        HealthyMarket.exchange_prices(symbol, exchanges).await
    }
}

/// Upstream where every order book fetch fails
struct BooksDown;

#[async_trait]
impl MarketDataProvider for BooksDown {
    async fn orderbook(&self, _exchange: &str, _symbol: &str) -> Result<OrderBook, MarketError> {
        Err(MarketError::Timeout("exchange unreachable".to_string()))
    }

    async fn ohlcv(
        &self,
        symbol: &str,
        period_minutes: u32,
        limit: usize,
    ) -> Result<Vec<OhlcvCandle>, MarketError> {
        HealthyMarket.ohlcv(symbol, period_minutes, limit).await
    }

    async fn exchange_prices(
        &self,
        _symbol: &str,
        exchanges: &[String],
    ) -> Result<FxHashMap<String, ExchangeQuote>, MarketError> {
        Ok(exchanges
            .iter()
            .map(|exchange| {
                (
                    exchange.clone(),
                    ExchangeQuote {
                        price: 0.998,
                        timestamp: Utc::now(),
                    },
                )
            })
            .collect())
    }
}

/// Price history provider serving a near-peg series
struct FlatHistory;

#[async_trait]
impl PriceHistoryProvider for FlatHistory {
    async fn price_history(
        &self,
        _asset_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, MarketError> {
        let points = (days as usize) * 24;
        let start = Utc::now() - Duration::hours(points as i64);
        Ok((0..points)
            .map(|i| PricePoint {
                timestamp: start + Duration::hours(i as i64),
                price: 1.0,
            })
            .collect())
    }
}

fn engine(market: Arc<dyn MarketDataProvider>) -> RiskEngine {
    RiskEngine::new(market, Arc::new(FlatHistory), EngineConfig::default())
}

#[tokio::test]
async fn healthy_evaluation_is_not_degraded() {
    let engine = engine(Arc::new(HealthyMarket));
    let assessment = engine.evaluate("usdt").await.unwrap();

    assert!(!assessment.degraded);
    assert_eq!(assessment.symbol, "usdt");
    assert_close(assessment.price, 1.0, 1e-9);
    assert_eq!(assessment.features.peg_deviation, 0.0);
    assert_eq!(assessment.features.volatility, 0.0);
    assert!(assessment.features.liquidity_score > 0.0);
    assert_close(assessment.summary.spread_bps, 20.0, 1e-6);
    assert!(!assessment.anomaly.is_anomaly);
}

#[tokio::test]
async fn candle_outage_degrades_but_still_evaluates() {
    let engine = engine(Arc::new(CandlesDown));
    let assessment = engine.evaluate("usdt").await.unwrap();

    assert!(assessment.degraded);
    // No candles: volatility and volume features fall back to zero
    assert_eq!(assessment.features.volatility, 0.0);
    assert_eq!(assessment.features.volume_anomaly_score, 0.0);
    // Book-derived features are unaffected
    assert!(assessment.features.liquidity_score > 0.0);
}

#[tokio::test]
async fn book_outage_falls_back_to_exchange_price_mean() {
    let engine = engine(Arc::new(BooksDown));
    let assessment = engine.evaluate("usdt").await.unwrap();

    assert!(assessment.degraded);
    assert_close(assessment.price, 0.998, 1e-9);
    assert_close(assessment.features.peg_deviation, -0.2, 1e-9);
    // Empty aggregated book reports the low-liquidity sentinel
    assert_eq!(assessment.features.liquidity_score, 0.1);
}

#[tokio::test]
async fn aggregate_orderbooks_rejects_malformed_levels() {
    let engine = engine(Arc::new(HealthyMarket));
    let books = exchange_books(vec![
        ("binance", raw_book(&[(0.999, 100.0)], &[(1.001, 100.0)])),
        ("kraken", raw_book(&[(-0.5, 100.0)], &[])),
    ]);

    let err = engine.aggregate_orderbooks(&books, 50).unwrap_err();
    assert!(matches!(err, MarketError::InvalidLevel { .. }));
}

#[tokio::test]
async fn aggregate_orderbooks_merges_valid_input() {
    let engine = engine(Arc::new(HealthyMarket));
    let books = exchange_books(vec![
        ("binance", raw_book(&[(0.999, 1_000.0)], &[(1.001, 1_000.0)])),
        ("kraken", raw_book(&[(0.999, 2_000.0)], &[(1.002, 500.0)])),
    ]);

    let aggregated = engine.aggregate_orderbooks(&books, 50).unwrap();
    assert_eq!(aggregated.bids.len(), 1);
    assert_close(aggregated.bids[0].volume_usd, 0.999 * 3_000.0, 1e-6);
    assert_eq!(aggregated.asks.len(), 2);
}

#[tokio::test]
async fn detect_anomaly_passes_through_to_the_detector() {
    let engine = engine(Arc::new(HealthyMarket));
    let result = engine.detect_anomaly(&crisis_anomaly_features());

    assert!(result.is_anomaly);
    assert_eq!(result.severity, Severity::High);
    assert_eq!(result.model_version, "fallback");
}

#[tokio::test]
async fn deviation_metrics_flow_through_the_cache() {
    let engine = engine(Arc::new(HealthyMarket));

    let result = engine.get_deviation_metrics("usdt", 7).await.unwrap();
    assert_eq!(result.period, "7d");
    assert!(!result.synthetic);
    assert_eq!(result.metrics.stability, 100.0);

    let stats = engine.cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.keys, vec!["usdt_7d".to_string()]);
}

#[tokio::test]
async fn deviation_metrics_reject_unknown_assets() {
    let engine = engine(Arc::new(HealthyMarket));
    let err = engine.get_deviation_metrics("doge", 7).await.unwrap_err();
    assert!(matches!(err, MarketError::UnsupportedAsset(_)));
}

#[tokio::test]
async fn rolling_series_fills_after_liquidity_evaluations() {
    let engine = engine(Arc::new(HealthyMarket));
    assert!(engine.get_rolling_series("usdt", 5).is_empty());

    let books = exchange_books(vec![(
        "binance",
        raw_book(&[(0.999, 1_000_000.0)], &[(1.001, 1_000_000.0)]),
    )]);
    let aggregated = engine.aggregate_orderbooks(&books, 50).unwrap();
    let snapshot = test_utils::snapshot("usdt", 1.0, aggregated, Vec::new(), FxHashMap::default());

    engine.compute_liquidity_features(&snapshot);
    let series = engine.get_rolling_series("usdt", 5);
    assert_eq!(series.len(), 5);
}
