//! Unit tests for the liquidity-prediction and anomaly feature sets

use feature_engine::FeatureEngineer;
use orderbook_aggregator::aggregate;
use pretty_assertions::assert_eq;
use services_common::MarketSnapshot;
use test_utils::{assert_close, exchange_books, flat_candles, quotes, snapshot, usd_book};

fn deep_snapshot(symbol: &str, price: f64) -> MarketSnapshot {
    let bids: Vec<(f64, f64)> = (0..30).map(|i| (1.0 - i as f64 * 1e-4, 100_000.0)).collect();
    let asks: Vec<(f64, f64)> = (0..30).map(|i| (1.0 + (i + 1) as f64 * 1e-4, 100_000.0)).collect();
    let books = exchange_books(vec![("binance", usd_book(&bids, &asks))]);

    snapshot(
        symbol,
        price,
        aggregate(&books, 50),
        flat_candles(120, price, 50_000.0),
        quotes(&[("binance", price), ("kraken", price + 0.002)]),
    )
}

#[test]
fn liquidity_features_distinguish_top10_from_top50_depth() {
    let engine = FeatureEngineer::new();
    let features = engine.compute_liquidity_features(&deep_snapshot("usdt", 1.0));

    // 30 levels a side: the 10-level depth sees a third of what 50 does
    assert!(features.order_book_depth > features.liquidity_depth);
    assert!(features.volume_1h > 0.0);
    assert!(features.cross_exchange_spread > 0.0);
    assert_eq!(features.volatility, 0.0);
}

#[test]
fn anomaly_spread_is_a_fraction_of_the_percent_feature() {
    let engine = FeatureEngineer::new();
    let snap = deep_snapshot("usdt", 1.0);

    let liquidity = engine.compute_liquidity_features(&snap);
    let anomaly = engine.compute_anomaly_features(&snap);

    assert_close(
        anomaly.cross_exchange_spread,
        liquidity.cross_exchange_spread / 100.0,
        1e-9,
    );
}

#[test]
fn first_anomaly_evaluation_reports_zero_deltas() {
    let engine = FeatureEngineer::new();
    let features = engine.compute_anomaly_features(&deep_snapshot("usdt", 1.0));

    assert_eq!(features.liquidity_change_pct, 0.0);
    assert_eq!(features.price_change_pct, 0.0);
}

#[test]
fn second_anomaly_evaluation_reports_change_against_previous() {
    let engine = FeatureEngineer::new();
    engine.compute_anomaly_features(&deep_snapshot("usdt", 1.0));

    let features = engine.compute_anomaly_features(&deep_snapshot("usdt", 0.98));
    assert_close(features.price_change_pct, -0.02, 1e-9);
    // Same book both times
    assert_eq!(features.liquidity_change_pct, 0.0);
}

#[test]
fn previous_values_update_once_per_evaluation() {
    let engine = FeatureEngineer::new();
    engine.compute_anomaly_features(&deep_snapshot("usdt", 1.0));
    engine.compute_anomaly_features(&deep_snapshot("usdt", 0.98));

    // Third call compares against 0.98, not 1.0
    let features = engine.compute_anomaly_features(&deep_snapshot("usdt", 0.98));
    assert_eq!(features.price_change_pct, 0.0);
}

#[test]
fn anomaly_deltas_are_isolated_per_asset() {
    let engine = FeatureEngineer::new();
    engine.compute_anomaly_features(&deep_snapshot("usdt", 1.0));

    let other = engine.compute_anomaly_features(&deep_snapshot("usdc", 0.95));
    assert_eq!(other.price_change_pct, 0.0);
}

#[test]
fn snapshot_features_match_the_sequential_pair() {
    let engine = FeatureEngineer::new();
    engine.compute_snapshot_features(&deep_snapshot("usdt", 1.0));

    let (risk, anomaly) = engine.compute_snapshot_features(&deep_snapshot("usdt", 0.98));
    assert_close(risk.peg_deviation, -2.0, 1e-9);
    assert_close(anomaly.price_change_pct, -0.02, 1e-9);

    // Stored previous values advanced exactly once
    let (_, again) = engine.compute_snapshot_features(&deep_snapshot("usdt", 0.98));
    assert_eq!(again.price_change_pct, 0.0);
}

#[test]
fn concurrent_snapshot_evaluations_keep_the_delta_chain_consistent() {
    let engine = FeatureEngineer::new();
    // With prices drawn from {1.00, 0.98}, every delta against the previous
    // evaluation is one of these three values
    let legal = [0.0, -0.02, 0.02 / 0.98];

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let engine = &engine;
            scope.spawn(move || {
                for i in 0..50 {
                    let price = if (worker + i) % 2 == 0 { 1.0 } else { 0.98 };
                    let (_, anomaly) = engine.compute_snapshot_features(&deep_snapshot("usdt", price));
                    assert!(
                        legal.iter().any(|&v| (anomaly.price_change_pct - v).abs() < 1e-9),
                        "unexpected price delta {}",
                        anomaly.price_change_pct
                    );
                }
            });
        }
    });
}

#[test]
fn anomaly_vector_preserves_canonical_order() {
    let engine = FeatureEngineer::new();
    let features = engine.compute_anomaly_features(&deep_snapshot("usdt", 1.0));
    let vector = features.to_vector();

    assert_eq!(vector.len(), 8);
    assert_eq!(vector[0], features.liquidity_depth);
    assert_eq!(vector[1], features.liquidity_change_pct);
    assert_eq!(vector[2], features.volume_zscore);
    assert_eq!(vector[3], features.price_change_pct);
    assert_eq!(vector[4], features.orderbook_imbalance);
    assert_eq!(vector[5], features.cross_exchange_spread);
    assert_eq!(vector[6], features.volatility_spike);
    assert_eq!(vector[7], features.bid_ask_spread);
}
