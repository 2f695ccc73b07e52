//! Unit tests for per-exchange USD normalization

use orderbook_aggregator::normalize;
use pretty_assertions::assert_eq;
use services_common::{BookSide, MarketError};
use test_utils::{assert_close, raw_book};

#[test]
fn every_level_converts_at_its_own_price() {
    let book = raw_book(
        &[(0.9990, 1_000.0), (0.9980, 2_000.0)],
        &[(1.0010, 3_000.0)],
    );

    let normalized = normalize(&book, BookSide::Both).unwrap();

    assert_close(normalized.bids[0].volume_usd, 999.0, 1e-9);
    assert_close(normalized.bids[1].volume_usd, 1_996.0, 1e-9);
    assert_close(normalized.asks[0].volume_usd, 3_003.0, 1e-9);
}

#[test]
fn volume_is_preserved_alongside_usd() {
    let book = raw_book(&[(0.999, 500.0)], &[]);
    let normalized = normalize(&book, BookSide::Bids).unwrap();
    assert_eq!(normalized.bids[0].volume, 500.0);
    assert_eq!(normalized.bids[0].price, 0.999);
}

#[test]
fn zero_volume_level_is_allowed() {
    let book = raw_book(&[(0.999, 0.0)], &[]);
    let normalized = normalize(&book, BookSide::Bids).unwrap();
    assert_eq!(normalized.bids[0].volume_usd, 0.0);
}

#[test]
fn negative_price_is_rejected() {
    let book = raw_book(&[(-1.0, 100.0)], &[]);
    let err = normalize(&book, BookSide::Bids).unwrap_err();
    assert!(matches!(
        err,
        MarketError::InvalidLevel { price, .. } if price == -1.0
    ));
}

#[test]
fn negative_volume_is_rejected() {
    let book = raw_book(&[], &[(1.001, -5.0)]);
    let err = normalize(&book, BookSide::Asks).unwrap_err();
    assert!(matches!(
        err,
        MarketError::InvalidLevel { volume, .. } if volume == -5.0
    ));
}

#[test]
fn normalization_has_no_side_effects_on_input() {
    let book = raw_book(&[(0.999, 100.0)], &[(1.001, 100.0)]);
    let before = book.clone();
    let _ = normalize(&book, BookSide::Both).unwrap();
    assert_eq!(book, before);
}
