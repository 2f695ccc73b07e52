//! Declarative anomaly rule table
//!
//! Each rule names the signal(s) it watches, the trigger condition, and how
//! severity is assigned. Keeping the table as data lets every threshold be
//! verified directly against the rule it encodes.

use serde::{Deserialize, Serialize};

use services_common::AnomalyFeatures;

/// One field of the 8-feature anomaly vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Top-10 depth score
    LiquidityDepth,
    /// Fractional liquidity change vs previous evaluation
    LiquidityChangePct,
    /// Volume z-score
    VolumeZscore,
    /// Fractional price change vs previous evaluation
    PriceChangePct,
    /// Order book USD imbalance
    OrderbookImbalance,
    /// Cross-exchange spread fraction
    CrossExchangeSpread,
    /// Volatility (coefficient of variation)
    VolatilitySpike,
    /// Bid-ask spread fraction
    BidAskSpread,
}

impl Signal {
    /// Read this signal out of a feature vector
    #[must_use]
    pub fn value(self, features: &AnomalyFeatures) -> f64 {
        match self {
            Self::LiquidityDepth => features.liquidity_depth,
            Self::LiquidityChangePct => features.liquidity_change_pct,
            Self::VolumeZscore => features.volume_zscore,
            Self::PriceChangePct => features.price_change_pct,
            Self::OrderbookImbalance => features.orderbook_imbalance,
            Self::CrossExchangeSpread => features.cross_exchange_spread,
            Self::VolatilitySpike => features.volatility_spike,
            Self::BidAskSpread => features.bid_ask_spread,
        }
    }
}

/// A predicate over one signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Signal strictly below the limit
    Below(Signal, f64),
    /// Signal at or below the limit
    AtOrBelow(Signal, f64),
    /// Signal strictly above the limit
    Above(Signal, f64),
    /// Absolute value of the signal strictly above the limit
    AbsAbove(Signal, f64),
}

impl Condition {
    /// Evaluate against a feature vector
    #[must_use]
    pub fn holds(&self, features: &AnomalyFeatures) -> bool {
        match *self {
            Self::Below(signal, limit) => signal.value(features) < limit,
            Self::AtOrBelow(signal, limit) => signal.value(features) <= limit,
            Self::Above(signal, limit) => signal.value(features) > limit,
            Self::AbsAbove(signal, limit) => signal.value(features).abs() > limit,
        }
    }
}

/// Alert severity, ordered from calm to critical
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// Nothing triggered
    Normal,
    /// Mild anomaly
    Low,
    /// Notable anomaly
    Medium,
    /// Severe anomaly
    High,
}

/// How a triggered rule's severity is assigned
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeverityRule {
    /// Always this severity
    Fixed(Severity),
    /// High when the escalation condition holds, Medium otherwise
    EscalateIf(Condition),
}

impl SeverityRule {
    /// Severity for a triggered rule
    #[must_use]
    pub fn assign(&self, features: &AnomalyFeatures) -> Severity {
        match self {
            Self::Fixed(severity) => *severity,
            Self::EscalateIf(condition) => {
                if condition.holds(features) {
                    Severity::High
                } else {
                    Severity::Medium
                }
            }
        }
    }
}

/// Named anomaly categories
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Sudden drop in liquidity vs the previous evaluation
    LiquidityDrop,
    /// Thin order book
    LowLiquidity,
    /// Volume far from its rolling average
    VolumeSpike,
    /// Extreme volume with price impact
    WhaleActivity,
    /// Large price move
    UnusualPriceMovement,
    /// One-sided order book
    OrderbookImbalance,
    /// Wide cross-exchange spread
    WideSpread,
    /// Elevated volatility
    VolatilitySpike,
    /// Widened bid-ask spread
    SpreadWidening,
}

/// One row of the threshold table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Alert emitted when all conditions hold
    pub alert: AlertKind,
    /// Trigger conditions (conjunction)
    pub conditions: &'static [Condition],
    /// Severity assignment for a triggered rule
    pub severity: SeverityRule,
}

/// The fixed threshold table
///
/// `low_liquidity` escalates at depth <= 0.15 (inclusive boundary): a depth
/// of exactly 0.15 is already the critical regime.
pub const RULES: &[Rule] = &[
    Rule {
        alert: AlertKind::LiquidityDrop,
        conditions: &[Condition::Below(Signal::LiquidityChangePct, -0.20)],
        severity: SeverityRule::Fixed(Severity::High),
    },
    Rule {
        alert: AlertKind::LowLiquidity,
        conditions: &[Condition::Below(Signal::LiquidityDepth, 0.30)],
        severity: SeverityRule::EscalateIf(Condition::AtOrBelow(Signal::LiquidityDepth, 0.15)),
    },
    Rule {
        alert: AlertKind::VolumeSpike,
        conditions: &[Condition::AbsAbove(Signal::VolumeZscore, 3.0)],
        severity: SeverityRule::EscalateIf(Condition::AbsAbove(Signal::VolumeZscore, 5.0)),
    },
    Rule {
        alert: AlertKind::WhaleActivity,
        conditions: &[
            Condition::AbsAbove(Signal::VolumeZscore, 4.0),
            Condition::AbsAbove(Signal::PriceChangePct, 0.01),
        ],
        severity: SeverityRule::Fixed(Severity::High),
    },
    Rule {
        alert: AlertKind::UnusualPriceMovement,
        conditions: &[Condition::AbsAbove(Signal::PriceChangePct, 0.02)],
        severity: SeverityRule::EscalateIf(Condition::AbsAbove(Signal::PriceChangePct, 0.05)),
    },
    Rule {
        alert: AlertKind::OrderbookImbalance,
        conditions: &[Condition::AbsAbove(Signal::OrderbookImbalance, 0.70)],
        severity: SeverityRule::Fixed(Severity::Medium),
    },
    Rule {
        alert: AlertKind::WideSpread,
        conditions: &[Condition::Above(Signal::CrossExchangeSpread, 0.01)],
        severity: SeverityRule::EscalateIf(Condition::Above(Signal::CrossExchangeSpread, 0.02)),
    },
    Rule {
        alert: AlertKind::VolatilitySpike,
        conditions: &[Condition::Above(Signal::VolatilitySpike, 0.05)],
        severity: SeverityRule::EscalateIf(Condition::Above(Signal::VolatilitySpike, 0.10)),
    },
    Rule {
        alert: AlertKind::SpreadWidening,
        conditions: &[Condition::Above(Signal::BidAskSpread, 0.005)],
        severity: SeverityRule::Fixed(Severity::Medium),
    },
];

/// Human-readable message for a triggered alert
#[must_use]
pub fn alert_message(kind: AlertKind, features: &AnomalyFeatures) -> String {
    match kind {
        AlertKind::LiquidityDrop => format!(
            "Liquidity dropped by {:.1}%",
            features.liquidity_change_pct.abs() * 100.0
        ),
        AlertKind::LowLiquidity => {
            format!("Low liquidity depth: {:.2}", features.liquidity_depth)
        }
        AlertKind::VolumeSpike => {
            format!("Volume {:.1}\u{3c3} from average", features.volume_zscore.abs())
        }
        AlertKind::WhaleActivity => format!(
            "Large trade detected: {:.1}\u{3c3} volume, {:.2}% price change",
            features.volume_zscore,
            features.price_change_pct.abs() * 100.0
        ),
        AlertKind::UnusualPriceMovement => format!(
            "Price changed by {:.2}%",
            features.price_change_pct.abs() * 100.0
        ),
        AlertKind::OrderbookImbalance => {
            let side = if features.orderbook_imbalance > 0.0 {
                "buy"
            } else {
                "sell"
            };
            format!(
                "Strong {side} pressure: {:.1}% imbalance",
                features.orderbook_imbalance.abs() * 100.0
            )
        }
        AlertKind::WideSpread => format!(
            "Wide cross-exchange spread: {:.2}%",
            features.cross_exchange_spread * 100.0
        ),
        AlertKind::VolatilitySpike => {
            format!("High volatility: {:.2}%", features.volatility_spike * 100.0)
        }
        AlertKind::SpreadWidening => format!(
            "Bid-ask spread widened to {:.2}%",
            features.bid_ask_spread * 100.0
        ),
    }
}
