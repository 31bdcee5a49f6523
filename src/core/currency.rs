//! Currencies and exchange-rate tables

use crate::core::error::{FetchError, ModelError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Czk,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    #[error("Unknown currency code: {0}")]
    Unknown(String),
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Czk];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Czk => "CZK",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            Currency::Usd => "US Dollar",
            Currency::Eur => "Euro",
            Currency::Czk => "Czech Koruna",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "CZK" => Ok(Currency::Czk),
            _ => Err(CurrencyError::Unknown(s.to_string())),
        }
    }
}

/// Rates relative to a single base currency.
///
/// Each rate is the number of units of the target currency per one unit of
/// `base`. The base itself is implicit and always converts at 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeTable {
    base: Currency,
    rates: HashMap<Currency, f64>,
}

impl ExchangeTable {
    pub fn new(base: Currency, rates: HashMap<Currency, f64>) -> Result<Self, ModelError> {
        if rates.is_empty() {
            return Err(ModelError::EmptyRates);
        }
        if let Some((currency, rate)) = rates
            .iter()
            .find(|(_, rate)| rate.is_nan() || **rate <= 0.0)
        {
            return Err(ModelError::NonPositiveRate {
                currency: *currency,
                rate: *rate,
            });
        }
        Ok(Self { base, rates })
    }

    pub fn base(&self) -> Currency {
        self.base
    }

    pub fn rates(&self) -> &HashMap<Currency, f64> {
        &self.rates
    }

    pub fn rate(&self, target: Currency) -> Result<f64, ModelError> {
        if target == self.base {
            return Ok(1.0);
        }
        self.rates
            .get(&target)
            .copied()
            .ok_or(ModelError::MissingRate(target))
    }

    /// Converts `amount` from one currency to another.
    ///
    /// Two non-base currencies are always routed through the base.
    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> Result<f64, ModelError> {
        if amount < 0.0 {
            return Err(ModelError::NegativeAmount(amount));
        }
        if from == self.base {
            return Ok(amount * self.rate(to)?);
        }
        let amount_in_base = amount / self.rate(from)?;
        if to == self.base {
            return Ok(amount_in_base);
        }
        Ok(amount_in_base * self.rate(to)?)
    }
}

#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn fetch_exchange_table(&self) -> Result<ExchangeTable, FetchError>;
}
