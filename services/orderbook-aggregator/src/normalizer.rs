//! Per-exchange order book normalization
//!
//! Converts base-asset volumes into USD volumes using each level's own
//! price. An external reference price is deliberately not used: the level
//! price is the rate the resting volume would actually trade at.

use services_common::{BookSide, MarketError, OrderBook, PriceLevel};

/// Normalize the requested side(s) of a raw book into USD-denominated levels
///
/// The returned book contains only the requested side(s); the other side is
/// left empty. Rejects any level with `price <= 0` or `volume < 0`.
///
/// # Errors
///
/// Returns [`MarketError::InvalidLevel`] for a malformed level.
pub fn normalize(book: &OrderBook, side: BookSide) -> Result<OrderBook, MarketError> {
    let mut result = OrderBook::empty(book.timestamp);

    if matches!(side, BookSide::Bids | BookSide::Both) {
        result.bids = normalize_side(&book.bids)?;
    }
    if matches!(side, BookSide::Asks | BookSide::Both) {
        result.asks = normalize_side(&book.asks)?;
    }

    Ok(result)
}

fn normalize_side(levels: &[PriceLevel]) -> Result<Vec<PriceLevel>, MarketError> {
    levels
        .iter()
        .map(|level| {
            if level.price <= 0.0 || level.volume < 0.0 || !level.price.is_finite() {
                return Err(MarketError::InvalidLevel {
                    price: level.price,
                    volume: level.volume,
                });
            }
            Ok(PriceLevel {
                price: level.price,
                volume: level.volume,
                volume_usd: level.volume * level.price,
            })
        })
        .collect()
}
