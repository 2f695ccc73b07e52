//! Common error types for services

use thiserror::Error;

/// Market data and feature pipeline errors
#[derive(Debug, Error)]
pub enum MarketError {
    /// A price level failed validation
    #[error("Invalid level: price={price}, volume={volume}")]
    InvalidLevel {
        /// Offending price
        price: f64,
        /// Offending volume
        volume: f64,
    },

    /// Asset symbol is not in the supported registry
    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    /// Upstream data source failed or returned nothing
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Timeout talking to an upstream source
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// True for failures the pipeline recovers from with documented fallbacks
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DataUnavailable(_) | Self::Timeout(_))
    }
}
