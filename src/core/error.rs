//! Error types shared by the fetchers, the cache service and the models.

use crate::core::currency::Currency;
use thiserror::Error;

/// Failure of a single upstream round trip.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport or connection failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Body could not be parsed into the expected structure
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Expected field missing or empty
    #[error("Price not found for: {0}")]
    NotFound(String),

    /// Field present but not numeric after normalization
    #[error("Failed to parse price '{value}' for: {name}")]
    ParseError { name: String, value: String },

    /// The remote service reported its own error
    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// Validation failure when building or using a domain value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Product name cannot be empty")]
    EmptyName,

    #[error("Product price must be a finite non-negative number: {0}")]
    InvalidPrice(f64),

    #[error("Exchange rates cannot be empty")]
    EmptyRates,

    #[error("Exchange rate for {currency} must be positive, got {rate}")]
    NonPositiveRate { currency: Currency, rate: f64 },

    #[error("Rate for {0} not found")]
    MissingRate(Currency),

    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(f64),
}
