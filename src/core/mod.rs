//! Core business logic: registry, pricing engine and per-user allocation

pub mod allocation;
pub mod auth;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod price;
pub mod registry;

// Re-export main types for cleaner imports
pub use auth::Session;
pub use engine::{PortfolioEngine, PortfolioSnapshot, PricingPolicy};
pub use error::PortfolioError;
pub use price::{HistoricalPeriod, PriceProvider, PriceQuote, PriceResult, QuoteOutcome};
pub use registry::{Registry, StockEntry, User};
