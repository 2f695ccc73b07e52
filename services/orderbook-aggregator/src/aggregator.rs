//! Multi-exchange ladder aggregation
//!
//! Flattens per-exchange books into one ladder per side, sums USD volume at
//! exactly matching prices (no bucketing or rounding), attaches cumulative
//! depth from the best price outward, and thins the result to a fixed number
//! of levels by index-based even sampling. Sampled points are real observed
//! levels, so the thinning is lossy but order-preserving.

use chrono::Utc;
use rustc_hash::FxHashMap;
use tracing::debug;

use services_common::{
    AggregatedLevel, AggregatedOrderBook, ExchangeDepth, OrderBook, PriceLevel,
    PER_EXCHANGE_AUDIT_LEVELS,
};

/// Merge normalized per-exchange books into one unified ladder
///
/// An empty `books` map yields an empty ladder; a side empty on every
/// exchange yields an empty aggregated side. Neither is an error.
#[must_use]
pub fn aggregate(books: &FxHashMap<String, OrderBook>, depth_levels: usize) -> AggregatedOrderBook {
    if books.is_empty() {
        return AggregatedOrderBook::empty(Utc::now());
    }

    let mut all_bids: Vec<(f64, f64)> = Vec::new();
    let mut all_asks: Vec<(f64, f64)> = Vec::new();

    for book in books.values() {
        for level in &book.bids {
            all_bids.push((level.price, level_usd(level)));
        }
        for level in &book.asks {
            all_asks.push((level.price, level_usd(level)));
        }
    }

    // Bids walk down from the best price, asks walk up
    all_bids.sort_by(|a, b| b.0.total_cmp(&a.0));
    all_asks.sort_by(|a, b| a.0.total_cmp(&b.0));

    let bids = sample_side(with_cumulative(merge_by_price(&all_bids)), depth_levels);
    let asks = sample_side(with_cumulative(merge_by_price(&all_asks)), depth_levels);

    debug!(
        exchanges = books.len(),
        bid_levels = bids.len(),
        ask_levels = asks.len(),
        "aggregated order books"
    );

    AggregatedOrderBook {
        bids,
        asks,
        per_exchange: audit_breakdown(books),
        aggregated_at: Utc::now(),
    }
}

/// Raw books may arrive without USD normalization; fall back to the level's
/// own price as the conversion rate.
fn level_usd(level: &PriceLevel) -> f64 {
    if level.volume_usd > 0.0 {
        level.volume_usd
    } else {
        level.volume * level.price
    }
}

/// Sum USD volume across exchanges at exactly matching prices.
///
/// Input is already sorted, so equal prices are adjacent; distinct prices
/// remain distinct.
fn merge_by_price(sorted: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());

    for &(price, usd) in sorted {
        match merged.last_mut() {
            Some((last_price, last_usd)) if *last_price == price => *last_usd += usd,
            _ => merged.push((price, usd)),
        }
    }

    merged
}

/// Attach the running USD sum walking away from the best price
fn with_cumulative(levels: Vec<(f64, f64)>) -> Vec<AggregatedLevel> {
    let mut cumulative = 0.0;
    levels
        .into_iter()
        .map(|(price, volume_usd)| {
            cumulative += volume_usd;
            AggregatedLevel {
                price,
                volume_usd,
                cumulative_usd: cumulative,
            }
        })
        .collect()
}

/// Thin the ladder to `depth_levels` entries at evenly spaced indices,
/// preserving each sampled level's cumulative value
fn sample_side(levels: Vec<AggregatedLevel>, depth_levels: usize) -> Vec<AggregatedLevel> {
    if levels.len() <= depth_levels || depth_levels == 0 {
        return levels;
    }

    let step = levels.len() as f64 / depth_levels as f64;
    (0..depth_levels)
        .filter_map(|i| {
            let idx = (i as f64 * step) as usize;
            levels.get(idx).copied()
        })
        .collect()
}

/// First raw levels per exchange, independent of sampling
fn audit_breakdown(books: &FxHashMap<String, OrderBook>) -> FxHashMap<String, ExchangeDepth> {
    books
        .iter()
        .map(|(exchange, book)| {
            let depth = ExchangeDepth {
                bids: book
                    .bids
                    .iter()
                    .take(PER_EXCHANGE_AUDIT_LEVELS)
                    .copied()
                    .collect(),
                asks: book
                    .asks
                    .iter()
                    .take(PER_EXCHANGE_AUDIT_LEVELS)
                    .copied()
                    .collect(),
            };
            (exchange.clone(), depth)
        })
        .collect()
}
