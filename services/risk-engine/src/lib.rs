//! Risk engine facade
//!
//! Single entry point for callers (HTTP layer, CLI): aggregates order
//! books, computes risk features, runs anomaly detection, and serves cached
//! deviation metrics. Live evaluations fetch order books, OHLCV and
//! multi-exchange prices concurrently, substitute documented fallbacks for
//! whatever fails, and then compute features synchronously.

pub mod provider;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use anomaly_detector::{AnomalyDetector, AnomalyResult, AnomalyScorer};
use deviation_monitor::{CacheStats, DeviationMonitor, DeviationResult, PriceHistoryProvider};
use feature_engine::FeatureEngineer;
use services_common::{
    AggregatedOrderBook, AnomalyFeatures, BookSide, BookSummary, EngineConfig, ExchangeQuote,
    LiquidityFeatures, MarketError, MarketSnapshot, NormalizedScores, OhlcvCandle, OrderBook,
    RiskFeatures, VOLUME_WINDOW_CAP,
};

pub use provider::MarketDataProvider;

/// Everything one live evaluation produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Asset symbol
    pub symbol: String,
    /// Reference price used for peg features
    pub price: f64,
    /// The 7 canonical features
    pub features: RiskFeatures,
    /// 0-1 stress scores derived from the features
    pub scores: NormalizedScores,
    /// Anomaly detection output
    pub anomaly: AnomalyResult,
    /// Aggregated book summary
    pub summary: BookSummary,
    /// True when any upstream fetch fell back to a default
    pub degraded: bool,
    /// When the evaluation ran
    pub evaluated_at: DateTime<Utc>,
}

/// The market-microstructure risk engine
pub struct RiskEngine {
    config: EngineConfig,
    market_data: Arc<dyn MarketDataProvider>,
    features: FeatureEngineer,
    detector: AnomalyDetector,
    deviation: DeviationMonitor,
}

impl RiskEngine {
    /// Engine with rule-only anomaly detection
    #[must_use]
    pub fn new(
        market_data: Arc<dyn MarketDataProvider>,
        price_history: Arc<dyn PriceHistoryProvider>,
        config: EngineConfig,
    ) -> Self {
        let features = FeatureEngineer::with_threshold(config.deviation_threshold_pct);
        let deviation = DeviationMonitor::with_ttl(
            price_history,
            Duration::from_secs(config.deviation_cache_ttl_secs),
        );
        Self {
            config,
            market_data,
            features,
            detector: AnomalyDetector::new(),
            deviation,
        }
    }

    /// Attach a statistical scorer to the anomaly path
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn AnomalyScorer>) -> Self {
        self.detector = AnomalyDetector::with_scorer(scorer);
        self.deviation = self.deviation.ml_enabled(true);
        self
    }

    /// Evaluate an asset against live upstream data
    ///
    /// The three upstream fetches run concurrently; each failure is
    /// replaced by its documented fallback (empty book, empty candle list,
    /// empty price map) and flagged through `degraded`. Feature computation
    /// itself is synchronous.
    ///
    /// # Errors
    ///
    /// Only input validation fails hard; upstream failures degrade.
    pub async fn evaluate(&self, symbol: &str) -> Result<RiskAssessment, MarketError> {
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);

        let books_fut = self.fetch_books(symbol, timeout);
        let candles_fut = self.fetch_candles(symbol, timeout);
        let prices_fut = self.fetch_prices(symbol, timeout);

        let ((books, books_degraded), (candles, candles_degraded), (prices, prices_degraded)) =
            tokio::join!(books_fut, candles_fut, prices_fut);
        let degraded = books_degraded || candles_degraded || prices_degraded;

        let book = orderbook_aggregator::aggregate(&books, self.config.depth_levels);
        let summary = orderbook_aggregator::summarize(&book);

        let price = reference_price(&summary, &prices);
        let snapshot = MarketSnapshot {
            symbol: symbol.to_string(),
            price,
            book,
            candles,
            exchange_prices: prices,
        };

        // One state guard across both feature sets: concurrent evaluations
        // of the same asset cannot interleave between them
        let (features, anomaly_features) = self.features.compute_snapshot_features(&snapshot);
        let anomaly = self.detector.detect(&anomaly_features);

        if degraded {
            warn!(symbol, "evaluation degraded by upstream fallback");
        } else {
            info!(
                symbol,
                peg_deviation = features.peg_deviation,
                is_anomaly = anomaly.is_anomaly,
                "evaluated asset"
            );
        }

        Ok(RiskAssessment {
            symbol: symbol.to_string(),
            price,
            scores: features.normalized_scores(),
            features,
            anomaly,
            summary,
            degraded,
            evaluated_at: Utc::now(),
        })
    }

    /// Compute the 7 canonical features for a prepared snapshot
    pub fn compute_risk_features(&self, snapshot: &MarketSnapshot) -> RiskFeatures {
        self.features.compute_risk_features(snapshot)
    }

    /// Compute the liquidity-prediction feature set for a prepared snapshot
    pub fn compute_liquidity_features(&self, snapshot: &MarketSnapshot) -> LiquidityFeatures {
        self.features.compute_liquidity_features(snapshot)
    }

    /// Normalize and aggregate raw per-exchange books
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidLevel`] when any book carries a
    /// malformed level; direct input is rejected, never coerced.
    pub fn aggregate_orderbooks(
        &self,
        books: &FxHashMap<String, OrderBook>,
        depth_levels: usize,
    ) -> Result<AggregatedOrderBook, MarketError> {
        let mut normalized = FxHashMap::default();
        for (exchange, book) in books {
            normalized.insert(
                exchange.clone(),
                orderbook_aggregator::normalize(book, BookSide::Both)?,
            );
        }
        Ok(orderbook_aggregator::aggregate(&normalized, depth_levels))
    }

    /// Run anomaly detection on a prepared feature vector
    #[must_use]
    pub fn detect_anomaly(&self, features: &AnomalyFeatures) -> AnomalyResult {
        self.detector.detect(features)
    }

    /// Cached deviation metrics for `(asset, days)`
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::UnsupportedAsset`] for unknown symbols.
    pub async fn get_deviation_metrics(
        &self,
        asset: &str,
        days: u32,
    ) -> Result<DeviationResult, MarketError> {
        self.deviation.get_deviation_metrics(asset, days).await
    }

    /// Rolling liquidity series for an asset
    #[must_use]
    pub fn get_rolling_series(&self, symbol: &str, length: usize) -> Vec<f64> {
        self.features.get_rolling_series(symbol, length)
    }

    /// Deviation cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.deviation.cache_stats()
    }

    /// Fetch and normalize order books from every configured exchange
    ///
    /// Returns whether any exchange had to be dropped.
    async fn fetch_books(
        &self,
        symbol: &str,
        timeout: Duration,
    ) -> (FxHashMap<String, OrderBook>, bool) {
        let fetches = self.config.exchanges.iter().map(|exchange| async move {
            let result =
                tokio::time::timeout(timeout, self.market_data.orderbook(exchange, symbol)).await;
            (exchange.clone(), result)
        });

        let mut books = FxHashMap::default();
        let mut degraded = false;
        for (exchange, result) in join_all(fetches).await {
            match result {
                Ok(Ok(raw)) => match orderbook_aggregator::normalize(&raw, BookSide::Both) {
                    Ok(book) => {
                        books.insert(exchange, book);
                    }
                    Err(err) => {
                        warn!(%exchange, symbol, error = %err, "dropping malformed book");
                        degraded = true;
                    }
                },
                Ok(Err(err)) => {
                    warn!(%exchange, symbol, error = %err, "orderbook fetch failed");
                    degraded = true;
                }
                Err(_) => {
                    warn!(%exchange, symbol, "orderbook fetch timed out");
                    degraded = true;
                }
            }
        }
        (books, degraded)
    }

    async fn fetch_candles(&self, symbol: &str, timeout: Duration) -> (Vec<OhlcvCandle>, bool) {
        match tokio::time::timeout(
            timeout,
            self.market_data.ohlcv(symbol, 1, VOLUME_WINDOW_CAP),
        )
        .await
        {
            Ok(Ok(candles)) => (candles, false),
            Ok(Err(err)) => {
                warn!(symbol, error = %err, "ohlcv fetch failed");
                (Vec::new(), true)
            }
            Err(_) => {
                warn!(symbol, "ohlcv fetch timed out");
                (Vec::new(), true)
            }
        }
    }

    async fn fetch_prices(
        &self,
        symbol: &str,
        timeout: Duration,
    ) -> (FxHashMap<String, ExchangeQuote>, bool) {
        match tokio::time::timeout(
            timeout,
            self.market_data
                .exchange_prices(symbol, &self.config.exchanges),
        )
        .await
        {
            Ok(Ok(prices)) => (prices, false),
            Ok(Err(err)) => {
                warn!(symbol, error = %err, "exchange price fetch failed");
                (FxHashMap::default(), true)
            }
            Err(_) => {
                warn!(symbol, "exchange price fetch timed out");
                (FxHashMap::default(), true)
            }
        }
    }
}

/// Reference price for peg features: book mid when both sides exist, else
/// the mean of exchange prices, else the 1.0 peg reference
fn reference_price(summary: &BookSummary, prices: &FxHashMap<String, ExchangeQuote>) -> f64 {
    if summary.best_bid > 0.0 && summary.best_ask > 0.0 {
        return summary.mid_price;
    }
    let observed: Vec<f64> = prices.values().map(|q| q.price).collect();
    if observed.is_empty() {
        1.0
    } else {
        observed.iter().sum::<f64>() / observed.len() as f64
    }
}
