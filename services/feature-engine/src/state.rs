//! Per-asset rolling state
//!
//! Owned exclusively by the feature engine; one record per asset symbol,
//! mutated under a per-asset lock.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::features::round_to;
use services_common::{LIQUIDITY_HISTORY_CAP, VOLUME_WINDOW_CAP};

/// Deviation duration state machine
///
/// Two states with hysteresis at the threshold: `Idle` until the absolute
/// deviation exceeds it, then `Tracking` until it falls back within range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviationState {
    /// Price within threshold of the peg
    Idle,
    /// Price beyond threshold since the recorded instant
    Tracking {
        /// When the deviation first crossed the threshold
        since: DateTime<Utc>,
    },
}

/// Tracks how long an asset has been beyond the deviation threshold
#[derive(Debug, Clone, Copy)]
pub struct DeviationTracker {
    state: DeviationState,
}

impl Default for DeviationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviationTracker {
    /// Start in the idle state
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DeviationState::Idle,
        }
    }

    /// Current state, for transition tests
    #[must_use]
    pub fn state(&self) -> DeviationState {
        self.state
    }

    /// Advance the machine and return minutes spent beyond the threshold
    ///
    /// Crossing above the threshold latches `now` as the start; returning
    /// within range resets to idle and reports 0.
    pub fn update(&mut self, deviation_pct: f64, threshold_pct: f64, now: DateTime<Utc>) -> f64 {
        if deviation_pct.abs() > threshold_pct {
            let since = match self.state {
                DeviationState::Tracking { since } => since,
                DeviationState::Idle => {
                    self.state = DeviationState::Tracking { since: now };
                    now
                }
            };
            let minutes = (now - since).num_milliseconds() as f64 / 60_000.0;
            round_to(minutes.max(0.0), 2)
        } else {
            self.state = DeviationState::Idle;
            0.0
        }
    }
}

/// All rolling state for one asset
#[derive(Debug, Default)]
pub struct AssetState {
    /// Deviation duration machine
    pub deviation: DeviationTracker,
    /// Most recent volume window (bounded)
    pub volumes: Vec<f64>,
    /// Liquidity depth samples, oldest first (bounded ring)
    pub liquidity_history: VecDeque<f64>,
    /// Liquidity depth from the previous anomaly evaluation
    pub prev_liquidity: Option<f64>,
    /// Price from the previous anomaly evaluation
    pub prev_price: Option<f64>,
}

impl AssetState {
    /// Replace the stored volume window, keeping only the newest samples
    pub fn store_volumes(&mut self, volumes: &[f64]) {
        let start = volumes.len().saturating_sub(VOLUME_WINDOW_CAP);
        self.volumes = volumes[start..].to_vec();
    }

    /// Append one liquidity sample, evicting the oldest past capacity
    pub fn push_liquidity(&mut self, value: f64) {
        if self.liquidity_history.len() >= LIQUIDITY_HISTORY_CAP {
            self.liquidity_history.pop_front();
        }
        self.liquidity_history.push_back(value);
    }

    /// Most recent `length` liquidity samples, left-padded by repeating the
    /// oldest sample; empty when there is no history at all
    #[must_use]
    pub fn rolling_series(&self, length: usize) -> Vec<f64> {
        if self.liquidity_history.is_empty() || length == 0 {
            return Vec::new();
        }

        let available = self.liquidity_history.len();
        if available >= length {
            return self
                .liquidity_history
                .iter()
                .skip(available - length)
                .copied()
                .collect();
        }

        let oldest = self.liquidity_history[0];
        let mut series = vec![oldest; length - available];
        series.extend(self.liquidity_history.iter().copied());
        series
    }
}
