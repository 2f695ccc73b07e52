//! Shared data model for market data and risk features

pub mod features;
pub mod market;
pub mod orderbook;

pub use features::*;
pub use market::*;
pub use orderbook::*;
