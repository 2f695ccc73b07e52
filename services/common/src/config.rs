//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DEPTH_LEVELS, DEFAULT_FETCH_TIMEOUT_SECS, DEVIATION_CACHE_TTL_SECS,
    DEVIATION_THRESHOLD_PCT,
};

/// Risk engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Depth levels in the aggregated ladder
    pub depth_levels: usize,
    /// Exchanges polled for order books and prices
    pub exchanges: Vec<String>,
    /// Percent deviation beyond which the duration tracker latches
    pub deviation_threshold_pct: f64,
    /// TTL for cached deviation results, in seconds
    pub deviation_cache_ttl_secs: u64,
    /// Timeout per upstream fetch, in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth_levels: DEFAULT_DEPTH_LEVELS,
            exchanges: vec![
                "binance".to_string(),
                "coinbase".to_string(),
                "kraken".to_string(),
            ],
            deviation_threshold_pct: DEVIATION_THRESHOLD_PCT,
            deviation_cache_ttl_secs: DEVIATION_CACHE_TTL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}
