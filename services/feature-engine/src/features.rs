//! Pure feature computations
//!
//! Each function maps a snapshot slice to one feature value; none touch
//! rolling state. Guard behavior (thin history, empty book, single
//! exchange) returns the documented sentinel instead of erroring.

use rustc_hash::FxHashMap;

use services_common::{
    AggregatedOrderBook, ExchangeQuote, OhlcvCandle, HOURLY_SAMPLE_CANDLES,
    LIQUIDITY_BASELINE_USD, LOW_LIQUIDITY_SENTINEL, MIN_CANDLES_FOR_STATS, PEG_REFERENCE,
};

/// Round to `dp` decimal places
#[must_use]
pub fn round_to(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Signed percent from the $1.00 peg
#[must_use]
pub fn peg_deviation(price: f64) -> f64 {
    round_to((price - PEG_REFERENCE) / PEG_REFERENCE * 100.0, 4)
}

/// Coefficient of variation of close prices; 0 with fewer than 10 candles
#[must_use]
pub fn volatility(candles: &[OhlcvCandle]) -> f64 {
    if candles.len() < MIN_CANDLES_FOR_STATS {
        return 0.0;
    }
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let mean_price = mean(&closes);
    if mean_price <= 0.0 {
        return 0.0;
    }
    round_to(std_dev(&closes) / mean_price, 6)
}

/// USD depth over the top `depth_levels` of each side, normalized by the
/// $10M baseline; the 0.1 sentinel when either side is empty
#[must_use]
pub fn liquidity_score(book: &AggregatedOrderBook, depth_levels: usize) -> f64 {
    if book.bids.is_empty() || book.asks.is_empty() {
        return LOW_LIQUIDITY_SENTINEL;
    }

    let side_usd = |levels: &[services_common::AggregatedLevel]| {
        levels
            .iter()
            .take(depth_levels)
            .map(|l| l.volume_usd)
            .sum::<f64>()
    };

    round_to((side_usd(&book.bids) + side_usd(&book.asks)) / LIQUIDITY_BASELINE_USD, 4)
}

/// (bid - ask) / (bid + ask) over full-depth USD volume, in [-1, 1]
#[must_use]
pub fn orderbook_imbalance(book: &AggregatedOrderBook) -> f64 {
    if book.is_empty() {
        return 0.0;
    }

    let bid_usd: f64 = book.bids.iter().map(|l| l.volume_usd).sum();
    let ask_usd: f64 = book.asks.iter().map(|l| l.volume_usd).sum();
    let total = bid_usd + ask_usd;
    if total == 0.0 {
        return 0.0;
    }

    round_to((bid_usd - ask_usd) / total, 4)
}

/// (max - min) / min across exchange prices, percent; 0 with fewer than 2
#[must_use]
pub fn cross_exchange_spread(prices: &FxHashMap<String, ExchangeQuote>) -> f64 {
    let mut observed: Vec<f64> = prices.values().map(|q| q.price).collect();
    observed.retain(|p| p.is_finite() && *p > 0.0);
    if observed.len() < 2 {
        return 0.0;
    }

    let max = observed.iter().copied().fold(f64::MIN, f64::max);
    let min = observed.iter().copied().fold(f64::MAX, f64::min);
    round_to((max - min) / min * 100.0, 4)
}

/// Z-score of the mean of the most recent hour of volume against the full
/// window; 0 with fewer than 10 candles or zero variance
#[must_use]
pub fn volume_zscore(volumes: &[f64]) -> f64 {
    if volumes.len() < MIN_CANDLES_FOR_STATS {
        return 0.0;
    }

    let recent = if volumes.len() >= HOURLY_SAMPLE_CANDLES {
        &volumes[volumes.len() - HOURLY_SAMPLE_CANDLES..]
    } else {
        volumes
    };
    let current = mean(recent);

    let window_mean = mean(volumes);
    let window_std = std_dev(volumes);
    if window_std == 0.0 {
        return 0.0;
    }

    round_to((current - window_mean) / window_std, 4)
}

/// (best ask - best bid) / mid, as a fraction; 0 when either side is
/// missing or either best price is 0
#[must_use]
pub fn bid_ask_spread(book: &AggregatedOrderBook) -> f64 {
    let (Some(best_bid), Some(best_ask)) = (
        book.bids.first().map(|l| l.price),
        book.asks.first().map(|l| l.price),
    ) else {
        return 0.0;
    };

    if best_bid == 0.0 || best_ask == 0.0 {
        return 0.0;
    }

    let mid = (best_bid + best_ask) / 2.0;
    if mid == 0.0 {
        return 0.0;
    }

    (best_ask - best_bid) / mid
}

/// Mean volume over the most recent hour of candles
#[must_use]
pub fn hourly_volume(candles: &[OhlcvCandle]) -> f64 {
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume_traded).collect();
    if volumes.is_empty() {
        return 0.0;
    }
    let recent = if volumes.len() >= HOURLY_SAMPLE_CANDLES {
        &volumes[volumes.len() - HOURLY_SAMPLE_CANDLES..]
    } else {
        &volumes[..]
    };
    mean(recent)
}
