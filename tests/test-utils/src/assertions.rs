//! Assertion helpers for float-heavy test code

/// Assert two floats agree within `eps`
///
/// # Panics
///
/// Panics with both values when they differ by more than `eps`.
pub fn assert_close(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() <= eps,
        "expected {expected}, got {actual} (eps {eps})"
    );
}

/// Assert a float sequence is monotonically non-decreasing
///
/// # Panics
///
/// Panics naming the first offending index.
pub fn assert_non_decreasing(values: &[f64]) {
    for (i, pair) in values.windows(2).enumerate() {
        assert!(
            pair[1] >= pair[0],
            "sequence decreases at index {}: {} -> {}",
            i + 1,
            pair[0],
            pair[1]
        );
    }
}
