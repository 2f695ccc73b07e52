//! Stateful feature engineering pipeline
//!
//! Turns market snapshots into the 7 canonical risk features plus the
//! liquidity-prediction and anomaly-detection feature sets. Rolling state
//! (deviation timers, volume/liquidity windows, previous-value deltas) is
//! kept per asset behind a keyed lock: evaluations for different assets run
//! in parallel, evaluations for the same asset are serialized.

pub mod features;
pub mod state;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use services_common::{
    AnomalyFeatures, LiquidityFeatures, MarketSnapshot, RiskFeatures, DEEP_BOOK_DEPTH_LEVELS,
    DEVIATION_THRESHOLD_PCT, LIQUIDITY_DEPTH_LEVELS,
};
use state::AssetState;

pub use state::{DeviationState, DeviationTracker};

/// Computes risk features from market snapshots, keeping per-asset rolling
/// state between evaluations
pub struct FeatureEngineer {
    assets: DashMap<String, Arc<Mutex<AssetState>>>,
    deviation_threshold_pct: f64,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngineer {
    /// Engine with the standard 0.5% deviation threshold
    #[must_use]
    pub fn new() -> Self {
        Self::with_threshold(DEVIATION_THRESHOLD_PCT)
    }

    /// Engine with a custom deviation threshold (percent)
    #[must_use]
    pub fn with_threshold(deviation_threshold_pct: f64) -> Self {
        Self {
            assets: DashMap::new(),
            deviation_threshold_pct,
        }
    }

    fn asset_state(&self, symbol: &str) -> Arc<Mutex<AssetState>> {
        self.assets
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(AssetState::default())))
            .clone()
    }

    /// Compute the 7 canonical risk features for one snapshot
    ///
    /// Updates the asset's deviation timer and volume window as a side
    /// effect.
    pub fn compute_risk_features(&self, snapshot: &MarketSnapshot) -> RiskFeatures {
        let state = self.asset_state(&snapshot.symbol);
        let mut state = state.lock();
        self.risk_features_locked(&mut state, snapshot)
    }

    /// Compute the risk and anomaly feature sets under one state guard
    ///
    /// Concurrent evaluations of the same asset cannot interleave between
    /// the two computations; the anomaly deltas always refer to the state
    /// this evaluation observed.
    pub fn compute_snapshot_features(
        &self,
        snapshot: &MarketSnapshot,
    ) -> (RiskFeatures, AnomalyFeatures) {
        let state = self.asset_state(&snapshot.symbol);
        let mut state = state.lock();
        let risk = self.risk_features_locked(&mut state, snapshot);
        let anomaly = anomaly_features_locked(&mut state, snapshot);
        (risk, anomaly)
    }

    fn risk_features_locked(
        &self,
        state: &mut AssetState,
        snapshot: &MarketSnapshot,
    ) -> RiskFeatures {
        let peg_deviation = features::peg_deviation(snapshot.price);
        let deviation_duration =
            state
                .deviation
                .update(peg_deviation, self.deviation_threshold_pct, Utc::now());

        let volumes: Vec<f64> = snapshot.candles.iter().map(|c| c.volume_traded).collect();
        state.store_volumes(&volumes);

        let computed = RiskFeatures {
            peg_deviation,
            deviation_duration,
            volatility: features::volatility(&snapshot.candles),
            liquidity_score: features::liquidity_score(&snapshot.book, LIQUIDITY_DEPTH_LEVELS),
            orderbook_imbalance: features::orderbook_imbalance(&snapshot.book),
            cross_exchange_spread: features::cross_exchange_spread(&snapshot.exchange_prices),
            volume_anomaly_score: features::volume_zscore(&volumes),
        };

        debug!(
            symbol = %snapshot.symbol,
            peg_deviation = computed.peg_deviation,
            liquidity_score = computed.liquidity_score,
            "computed risk features"
        );

        computed
    }

    /// Compute liquidity-prediction features
    ///
    /// Appends the current liquidity depth to the asset's rolling window so
    /// it can be retrieved later as a sequence.
    pub fn compute_liquidity_features(&self, snapshot: &MarketSnapshot) -> LiquidityFeatures {
        let liquidity_depth = features::liquidity_score(&snapshot.book, LIQUIDITY_DEPTH_LEVELS);

        let state = self.asset_state(&snapshot.symbol);
        state.lock().push_liquidity(liquidity_depth);

        LiquidityFeatures {
            liquidity_depth,
            order_book_depth: features::liquidity_score(&snapshot.book, DEEP_BOOK_DEPTH_LEVELS),
            volume_1h: features::hourly_volume(&snapshot.candles),
            cross_exchange_spread: features::cross_exchange_spread(&snapshot.exchange_prices),
            volatility: features::volatility(&snapshot.candles),
        }
    }

    /// Compute the 8-feature anomaly vector
    ///
    /// Percentage changes are taken against the previously stored liquidity
    /// and price; the stored values are overwritten with the current ones
    /// exactly once, after the deltas are computed.
    pub fn compute_anomaly_features(&self, snapshot: &MarketSnapshot) -> AnomalyFeatures {
        let state = self.asset_state(&snapshot.symbol);
        let mut state = state.lock();
        anomaly_features_locked(&mut state, snapshot)
    }

    /// Most recent `length` liquidity samples for an asset, left-padded by
    /// repeating the oldest sample; empty when the asset has no history
    #[must_use]
    pub fn get_rolling_series(&self, symbol: &str, length: usize) -> Vec<f64> {
        self.assets
            .get(symbol)
            .map(|state| state.lock().rolling_series(length))
            .unwrap_or_default()
    }
}

fn anomaly_features_locked(state: &mut AssetState, snapshot: &MarketSnapshot) -> AnomalyFeatures {
    let liquidity_depth = features::liquidity_score(&snapshot.book, LIQUIDITY_DEPTH_LEVELS);
    let volumes: Vec<f64> = snapshot.candles.iter().map(|c| c.volume_traded).collect();

    let liquidity_change_pct = fractional_change(state.prev_liquidity, liquidity_depth);
    let price_change_pct = fractional_change(state.prev_price, snapshot.price);

    let computed = AnomalyFeatures {
        liquidity_depth,
        liquidity_change_pct,
        volume_zscore: features::volume_zscore(&volumes),
        price_change_pct,
        orderbook_imbalance: features::orderbook_imbalance(&snapshot.book),
        // The detector's spread thresholds are fractions, not percent
        cross_exchange_spread: features::cross_exchange_spread(&snapshot.exchange_prices) / 100.0,
        volatility_spike: features::volatility(&snapshot.candles),
        bid_ask_spread: features::bid_ask_spread(&snapshot.book),
    };

    state.prev_liquidity = Some(liquidity_depth);
    state.prev_price = Some(snapshot.price);

    computed
}

/// (current - previous) / previous, 0 when there is no usable prior
fn fractional_change(previous: Option<f64>, current: f64) -> f64 {
    match previous {
        Some(prev) if prev != 0.0 => (current - prev) / prev,
        _ => 0.0,
    }
}
