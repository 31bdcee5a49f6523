//! Core business logic abstractions

pub mod bundle;
pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use currency::{Currency, ExchangeRateProvider, ExchangeTable};
pub use error::{FetchError, ModelError};
pub use price::{PriceProvider, ProductPrice};
