//! Risk feature records produced by the feature engine

use serde::{Deserialize, Serialize};

/// The 7 canonical risk features, created fresh per evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFeatures {
    /// Percent from the $1.00 peg, signed
    pub peg_deviation: f64,
    /// Minutes the price has been beyond the deviation threshold
    pub deviation_duration: f64,
    /// Coefficient of variation of close prices
    pub volatility: f64,
    /// Normalized USD depth score
    pub liquidity_score: f64,
    /// (bid - ask) / (bid + ask) USD imbalance, in [-1, 1]
    pub orderbook_imbalance: f64,
    /// Max-min spread across exchanges, percent
    pub cross_exchange_spread: f64,
    /// Z-score of recent volume against the full window
    pub volume_anomaly_score: f64,
}

impl RiskFeatures {
    /// Feature vector in canonical order, for scorer input
    #[must_use]
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.peg_deviation,
            self.deviation_duration,
            self.volatility,
            self.liquidity_score,
            self.orderbook_imbalance,
            self.cross_exchange_spread,
            self.volume_anomaly_score,
        ]
    }

    /// Each feature normalized into a 0-1 stress score
    #[must_use]
    pub fn normalized_scores(&self) -> NormalizedScores {
        NormalizedScores {
            peg_deviation_score: (self.peg_deviation.abs() / 2.0).min(1.0),
            liquidity_stress_score: 1.0 - self.liquidity_score.min(1.0),
            volatility_score: (self.volatility / 0.02).min(1.0),
            imbalance_score: self.orderbook_imbalance.abs(),
            spread_score: (self.cross_exchange_spread / 0.01).min(1.0),
            volume_anomaly_score: (self.volume_anomaly_score / 5.0).min(1.0),
            // 3 hours of sustained deviation saturates the duration score
            duration_score: (self.deviation_duration / 180.0).min(1.0),
        }
    }
}

/// 0-1 stress scores derived from [`RiskFeatures`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedScores {
    /// Peg deviation stress
    pub peg_deviation_score: f64,
    /// Inverse of liquidity health
    pub liquidity_stress_score: f64,
    /// Volatility stress
    pub volatility_score: f64,
    /// Order book imbalance magnitude
    pub imbalance_score: f64,
    /// Cross-exchange spread stress
    pub spread_score: f64,
    /// Volume anomaly stress
    pub volume_anomaly_score: f64,
    /// Deviation duration stress
    pub duration_score: f64,
}

/// Features feeding the liquidity prediction path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityFeatures {
    /// Top-10 depth score
    pub liquidity_depth: f64,
    /// Top-50 depth score
    pub order_book_depth: f64,
    /// Mean volume over the most recent hour of candles
    pub volume_1h: f64,
    /// Max-min spread across exchanges, percent
    pub cross_exchange_spread: f64,
    /// Coefficient of variation of close prices
    pub volatility: f64,
}

/// The 8-feature vector consumed by the anomaly detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFeatures {
    /// Top-10 depth score
    pub liquidity_depth: f64,
    /// Fractional change vs the previous stored liquidity (0 if no prior)
    pub liquidity_change_pct: f64,
    /// Z-score of recent volume against the full window
    pub volume_zscore: f64,
    /// Fractional change vs the previous stored price (0 if no prior)
    pub price_change_pct: f64,
    /// (bid - ask) / (bid + ask) USD imbalance
    pub orderbook_imbalance: f64,
    /// Max-min spread across exchanges, as a fraction
    pub cross_exchange_spread: f64,
    /// Coefficient of variation of close prices
    pub volatility_spike: f64,
    /// (best ask - best bid) / mid, as a fraction
    pub bid_ask_spread: f64,
}

impl AnomalyFeatures {
    /// Feature vector in canonical order, for scorer input
    #[must_use]
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.liquidity_depth,
            self.liquidity_change_pct,
            self.volume_zscore,
            self.price_change_pct,
            self.orderbook_imbalance,
            self.cross_exchange_spread,
            self.volatility_spike,
            self.bid_ask_spread,
        ]
    }
}
