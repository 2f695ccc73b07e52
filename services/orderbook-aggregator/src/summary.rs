//! Summary metrics for an aggregated book

use services_common::{AggregatedOrderBook, BookSummary, PEG_REFERENCE};

/// Derive best bid/ask, mid, spread and total depth from an aggregated book
///
/// When either side is empty the mid price falls back to the 1.0 peg
/// reference with zero totals; callers must treat that as "no liquidity" and
/// the mid as unknown, not as "at peg".
#[must_use]
pub fn summarize(book: &AggregatedOrderBook) -> BookSummary {
    let (Some(best_bid), Some(best_ask)) = (
        book.bids.first().map(|l| l.price),
        book.asks.first().map(|l| l.price),
    ) else {
        return BookSummary {
            best_bid: 0.0,
            best_ask: 0.0,
            mid_price: PEG_REFERENCE,
            spread: 0.0,
            spread_bps: 0.0,
            total_bid_usd: 0.0,
            total_ask_usd: 0.0,
        };
    };

    let mid_price = (best_bid + best_ask) / 2.0;
    let spread = best_ask - best_bid;
    let spread_bps = if mid_price > 0.0 {
        spread / mid_price * 10_000.0
    } else {
        0.0
    };

    BookSummary {
        best_bid,
        best_ask,
        mid_price,
        spread,
        spread_bps,
        total_bid_usd: book.bids.last().map_or(0.0, |l| l.cumulative_usd),
        total_ask_usd: book.asks.last().map_or(0.0, |l| l.cumulative_usd),
    }
}
