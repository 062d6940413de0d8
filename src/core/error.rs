//! Domain error types

use std::time::Duration;
use thiserror::Error;

/// Failures raised by the registry, the pricing engine and authentication.
///
/// The provider variants never reach callers of the engine: they are caught when a quote is
/// taken and kept on the snapshot entry as the reason for falling back to the default price.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    #[error("Price request for {ticker} timed out after {timeout:?}")]
    ProviderTimeout { ticker: String, timeout: Duration },

    #[error("Price provider failed for {ticker}: {message}")]
    ProviderError { ticker: String, message: String },

    #[error("Unusable price {price} for {ticker}")]
    InvalidQuote { ticker: String, price: f64 },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Ticker not in registry: {0}")]
    TickerNotInRegistry(String),

    #[error("Invalid username or password")]
    InvalidCredentials,
}

impl PortfolioError {
    /// True for failures of the market data provider.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            PortfolioError::ProviderTimeout { .. }
                | PortfolioError::ProviderError { .. }
                | PortfolioError::InvalidQuote { .. }
        )
    }
}
