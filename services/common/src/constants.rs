//! Common constants used across all services
//!
//! Single source of truth for all magic numbers

// Peg reference
/// The price every stablecoin is measured against
pub const PEG_REFERENCE: f64 = 1.0;
/// Deviation (in percent from peg) beyond which the duration tracker latches
pub const DEVIATION_THRESHOLD_PCT: f64 = 0.5;

// Liquidity
/// USD depth considered "healthy" liquidity; scores are normalized by this
pub const LIQUIDITY_BASELINE_USD: f64 = 10_000_000.0;
/// Score reported when either side of the book is empty
pub const LOW_LIQUIDITY_SENTINEL: f64 = 0.1;
/// Depth levels used for the standard liquidity score
pub const LIQUIDITY_DEPTH_LEVELS: usize = 10;
/// Depth levels used for the deep order-book score
pub const DEEP_BOOK_DEPTH_LEVELS: usize = 50;

// Order book aggregation
/// Default number of levels in the aggregated ladder
pub const DEFAULT_DEPTH_LEVELS: usize = 50;
/// Raw levels kept per exchange for the audit breakdown
pub const PER_EXCHANGE_AUDIT_LEVELS: usize = 10;

// Feature windows (1-minute candles)
/// Minimum candles required before volatility/volume features are meaningful
pub const MIN_CANDLES_FOR_STATS: usize = 10;
/// Candles forming the "current" volume sample (1 hour of minute data)
pub const HOURLY_SAMPLE_CANDLES: usize = 60;
/// Retained volume samples per asset (24 hours of minute data)
pub const VOLUME_WINDOW_CAP: usize = 1440;
/// Retained liquidity samples per asset
pub const LIQUIDITY_HISTORY_CAP: usize = 1440;

// Deviation cache
/// Seconds a cached deviation result stays fresh
pub const DEVIATION_CACHE_TTL_SECS: u64 = 300;

// Upstream fetches
/// Timeout applied to each upstream data fetch
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
