//! Pricing abstractions and core types

use crate::core::currency::Currency;
use crate::core::error::{FetchError, ModelError};
use async_trait::async_trait;

/// Currency every product price is quoted in.
pub const PRICE_CURRENCY: Currency = Currency::Usd;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductPrice {
    name: String,
    price: f64,
}

impl ProductPrice {
    pub fn new(name: impl Into<String>, price: f64) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::EmptyName);
        }
        if !price.is_finite() || price < 0.0 {
            return Err(ModelError::InvalidPrice(price));
        }
        Ok(Self { name, price })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_product_price(&self, name: &str) -> Result<ProductPrice, FetchError>;
}
