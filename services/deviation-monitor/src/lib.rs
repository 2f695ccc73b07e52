//! Peg deviation monitoring
//!
//! Combines the TTL-bounded [`DeviationCache`] with the deviation
//! calculator: results are computed once per (asset, period) key and served
//! from cache until they expire.

pub mod cache;
pub mod calculator;

use std::sync::Arc;
use std::time::Duration;

use services_common::MarketError;

pub use cache::{CacheStats, DeviationCache};
pub use calculator::{
    aggregate_metrics, asset_id, deviation_series, fetch_or_synthesize, synthetic_prices,
    DeviationMetrics, DeviationPoint, DeviationResult, PriceHistoryProvider, PricePoint,
    SUPPORTED_ASSETS,
};

use chrono::Utc;

/// Cached deviation analysis over a price-history provider
pub struct DeviationMonitor {
    provider: Arc<dyn PriceHistoryProvider>,
    cache: DeviationCache<DeviationResult>,
    ml_enabled: bool,
}

impl DeviationMonitor {
    /// Monitor with the standard 300 s cache TTL
    #[must_use]
    pub fn new(provider: Arc<dyn PriceHistoryProvider>) -> Self {
        Self {
            provider,
            cache: DeviationCache::new(),
            ml_enabled: false,
        }
    }

    /// Monitor with a custom cache TTL
    #[must_use]
    pub fn with_ttl(provider: Arc<dyn PriceHistoryProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            cache: DeviationCache::with_ttl(ttl),
            ml_enabled: false,
        }
    }

    /// Mark results as ML-assisted (a scorer participates downstream)
    #[must_use]
    pub fn ml_enabled(mut self, enabled: bool) -> Self {
        self.ml_enabled = enabled;
        self
    }

    /// Deviation series and aggregate metrics for `(asset, period_days)`
    ///
    /// Served from cache while fresh; recomputed (with request coalescing)
    /// once expired. A failed provider fetch degrades to the synthetic
    /// fallback series with `synthetic: true`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::UnsupportedAsset`] for unknown symbols.
    pub async fn get_deviation_metrics(
        &self,
        asset: &str,
        period_days: u32,
    ) -> Result<DeviationResult, MarketError> {
        let id = asset_id(asset)?;
        let symbol = asset.to_lowercase();
        let ml_enabled = self.ml_enabled;

        self.cache
            .get_or_compute(&symbol, period_days, || async {
                let (prices, synthetic) =
                    fetch_or_synthesize(self.provider.as_ref(), &symbol, id, period_days).await;

                let data = deviation_series(&prices);
                let metrics = aggregate_metrics(&data);

                Ok(DeviationResult {
                    asset: symbol.clone(),
                    period: format!("{period_days}d"),
                    data_points: data.len(),
                    data,
                    metrics,
                    timestamp: Utc::now(),
                    ml_enabled,
                    synthetic,
                })
            })
            .await
    }

    /// Drop all cached results
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Cache statistics for operational visibility
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
