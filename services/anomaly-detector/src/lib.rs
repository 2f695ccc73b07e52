//! Rule-based market anomaly detection
//!
//! Maps the 8-feature anomaly vector to severity-tagged alerts through a
//! fixed threshold table. A statistical scorer can be plugged in through
//! [`AnomalyScorer`]; without one the detector degrades to a rule-count
//! fallback with a flagged `model_version`.

pub mod rules;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use services_common::AnomalyFeatures;

pub use rules::{AlertKind, Condition, Rule, Severity, SeverityRule, Signal, RULES};

/// One triggered anomaly alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Anomaly category
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Assigned severity
    pub severity: Severity,
    /// Human-readable detail
    pub message: String,
}

/// Output of one detection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Scorer output, or the fallback sentinel (-0.5 anomalous, 0.0 not)
    pub anomaly_score: f64,
    /// Whether the vector is anomalous
    pub is_anomaly: bool,
    /// Maximum severity among triggered alerts; Normal when none triggered
    pub severity: Severity,
    /// Triggered alerts
    pub alerts: Vec<Alert>,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
    /// Which model produced the score ("fallback" when no scorer is loaded)
    pub model_version: String,
    /// When the detection ran
    pub timestamp: DateTime<Utc>,
}

/// Prediction from an external statistical scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePrediction {
    /// Anomaly score; lower means more anomalous
    pub score: f64,
    /// Scorer's anomaly label
    pub is_anomaly: bool,
}

/// Consumed interface to any statistical/ML scorer
///
/// The detector never inspects model internals; it must keep working (with
/// reduced fidelity) when no scorer is present at all.
pub trait AnomalyScorer: Send + Sync {
    /// Score an 8-feature vector in canonical order
    fn predict(&self, features: &[f64]) -> ScorePrediction;

    /// Identifier reported in results
    fn version(&self) -> String;
}

/// Rule-driven anomaly detector with optional statistical scorer
#[derive(Default)]
pub struct AnomalyDetector {
    scorer: Option<Arc<dyn AnomalyScorer>>,
}

impl AnomalyDetector {
    /// Detector running on rules alone
    #[must_use]
    pub fn new() -> Self {
        Self { scorer: None }
    }

    /// Detector backed by a statistical scorer
    #[must_use]
    pub fn with_scorer(scorer: Arc<dyn AnomalyScorer>) -> Self {
        Self {
            scorer: Some(scorer),
        }
    }

    /// Evaluate one anomaly feature vector
    ///
    /// Alerts always come from the threshold table; the score, label and
    /// confidence come from the scorer when one is loaded, else from the
    /// rule-count fallback.
    #[must_use]
    pub fn detect(&self, features: &AnomalyFeatures) -> AnomalyResult {
        let alerts = evaluate_rules(features);
        let alert_severity = alerts
            .iter()
            .map(|a| a.severity)
            .max()
            .unwrap_or(Severity::Normal);

        let result = match &self.scorer {
            Some(scorer) => {
                let prediction = scorer.predict(&features.to_vector());
                AnomalyResult {
                    anomaly_score: prediction.score,
                    is_anomaly: prediction.is_anomaly,
                    severity: alert_severity.max(score_severity(prediction.score)),
                    alerts,
                    confidence: (prediction.score.abs() / 2.0).min(1.0),
                    model_version: scorer.version(),
                    timestamp: Utc::now(),
                }
            }
            None => {
                let is_anomaly = fallback_trigger_count(features) >= 2;
                AnomalyResult {
                    anomaly_score: if is_anomaly { -0.5 } else { 0.0 },
                    is_anomaly,
                    severity: alert_severity,
                    alerts,
                    confidence: 0.6,
                    model_version: "fallback".to_string(),
                    timestamp: Utc::now(),
                }
            }
        };

        if result.is_anomaly {
            debug!(
                severity = ?result.severity,
                alerts = result.alerts.len(),
                model = %result.model_version,
                "anomaly detected"
            );
        }

        result
    }
}

/// Run the full threshold table against a feature vector
#[must_use]
pub fn evaluate_rules(features: &AnomalyFeatures) -> Vec<Alert> {
    RULES
        .iter()
        .filter(|rule| rule.conditions.iter().all(|c| c.holds(features)))
        .map(|rule| Alert {
            kind: rule.alert,
            severity: rule.severity.assign(features),
            message: rules::alert_message(rule.alert, features),
        })
        .collect()
}

/// Severity band for a scorer's anomaly score (lower = more anomalous)
fn score_severity(score: f64) -> Severity {
    if score < -0.7 {
        Severity::High
    } else if score < -0.5 {
        Severity::Medium
    } else if score < -0.3 {
        Severity::Low
    } else {
        Severity::Normal
    }
}

/// Without a scorer, two of these three coarse signals mark an anomaly
fn fallback_trigger_count(features: &AnomalyFeatures) -> usize {
    [
        features.liquidity_depth < 0.3,
        features.volume_zscore.abs() > 3.0,
        features.price_change_pct.abs() > 0.02,
    ]
    .into_iter()
    .filter(|&t| t)
    .count()
}
