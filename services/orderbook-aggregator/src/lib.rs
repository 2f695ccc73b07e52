//! Multi-exchange order book aggregation
//!
//! Normalizes per-exchange ladders into USD-denominated depth, merges them
//! into one unified ladder with cumulative depth, and derives summary
//! metrics (best bid/ask, mid, spread, total depth).

pub mod aggregator;
pub mod normalizer;
pub mod summary;

pub use aggregator::aggregate;
pub use normalizer::normalize;
pub use summary::summarize;
