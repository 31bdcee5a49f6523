//! Works out how many case and key bundles an amount of money buys.
use crate::core::currency::{Currency, ExchangeTable};
use crate::core::error::ModelError;
use crate::core::price::{PRICE_CURRENCY, ProductPrice};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    #[error("Bundle cost must be positive, got {0}")]
    InvalidBundleCost(f64),

    #[error("Currency conversion failed: {0}")]
    Conversion(#[from] ModelError),
}

/// Result of a bundle calculation for one case.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleQuote {
    pub case_name: String,
    pub amount: f64,
    pub currency: Currency,
    /// `amount` expressed in the price currency
    pub amount_in_price_currency: f64,
    pub case_price: f64,
    pub key_price: f64,
    pub bundle_cost: f64,
    pub bundles: u64,
    /// Money left over after buying `bundles`, in `currency`
    pub remaining: f64,
}

/// Converts `amount` into the price currency, then counts the whole bundles
/// of one case plus one key it covers.
pub fn quote_bundles(
    amount: f64,
    currency: Currency,
    case: &ProductPrice,
    key_price: f64,
    table: &ExchangeTable,
) -> Result<BundleQuote, QuoteError> {
    let amount_in_price_currency = table.convert(amount, currency, PRICE_CURRENCY)?;
    let bundle_cost = case.price() + key_price;
    if bundle_cost.is_nan() || bundle_cost <= 0.0 {
        return Err(QuoteError::InvalidBundleCost(bundle_cost));
    }

    let bundles = (amount_in_price_currency / bundle_cost).floor() as u64;
    let remaining_in_price_currency =
        (amount_in_price_currency - bundles as f64 * bundle_cost).max(0.0);
    let remaining = table.convert(remaining_in_price_currency, PRICE_CURRENCY, currency)?;

    debug!(
        "{amount} {currency} = {amount_in_price_currency:.4} {PRICE_CURRENCY}, bundle cost {bundle_cost:.2}: {bundles} bundles of {}",
        case.name()
    );

    Ok(BundleQuote {
        case_name: case.name().to_string(),
        amount,
        currency,
        amount_in_price_currency,
        case_price: case.price(),
        key_price,
        bundle_cost,
        bundles,
        remaining,
    })
}
