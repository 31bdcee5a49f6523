use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::core::config::SteamProviderConfig;
use crate::core::currency::Currency;
use crate::core::error::FetchError;
use crate::core::price::{PRICE_CURRENCY, PriceProvider, ProductPrice};

/// Steam wallet currency code for a currency, if the market offers it.
pub fn steam_currency_code(currency: Currency) -> Option<u32> {
    match currency {
        Currency::Usd => Some(1),
        Currency::Eur => Some(3),
        Currency::Czk => None,
    }
}

/// Strips currency symbols and grouping marks from a market price string and
/// normalizes the decimal separator to a dot.
///
/// When both `,` and `.` occur, the right-most one is taken as the decimal
/// separator. Otherwise a `,` is treated as decimal.
pub fn normalize_price(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    match (kept.rfind(','), kept.rfind('.')) {
        (Some(comma), Some(dot)) => {
            let decimal = comma.max(dot);
            kept.char_indices()
                .filter_map(|(i, c)| match c {
                    ',' | '.' if i == decimal => Some('.'),
                    ',' | '.' => None,
                    _ => Some(c),
                })
                .collect()
        }
        _ => kept.replace(',', "."),
    }
}

#[derive(Debug, Deserialize)]
struct PriceOverviewResponse {
    lowest_price: Option<String>,
}

pub struct SteamMarketProvider {
    endpoint: Url,
    app_id: u32,
    currency_code: u32,
}

impl SteamMarketProvider {
    pub fn new(config: &SteamProviderConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&format!(
            "{}/market/priceoverview/",
            config.base_url.trim_end_matches('/')
        ))
        .with_context(|| format!("Invalid Steam base URL: {}", config.base_url))?;

        // Prices are parsed as PRICE_CURRENCY, so Steam must quote in it
        let Some(expected) = steam_currency_code(PRICE_CURRENCY) else {
            anyhow::bail!("The Steam market does not quote prices in {PRICE_CURRENCY}");
        };
        if config.currency_code != expected {
            anyhow::bail!(
                "Steam currency code {} does not match the price currency {} (expected {})",
                config.currency_code,
                PRICE_CURRENCY,
                expected
            );
        }

        Ok(Self {
            endpoint,
            app_id: config.app_id,
            currency_code: config.currency_code,
        })
    }

    fn price_url(&self, name: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("appid", &self.app_id.to_string())
            .append_pair("currency", &self.currency_code.to_string())
            .append_pair("market_hash_name", name);
        url
    }
}

#[async_trait]
impl PriceProvider for SteamMarketProvider {
    #[instrument(skip(self))]
    async fn fetch_product_price(&self, name: &str) -> Result<ProductPrice, FetchError> {
        let url = self.price_url(name);
        debug!("Requesting product price from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("caseprice/1.0")
            .build()?;
        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Upstream(format!(
                "HTTP error: {} for product: {}",
                response.status(),
                name
            )));
        }

        let text = response.text().await?;
        let data: PriceOverviewResponse = serde_json::from_str(&text).map_err(|e| {
            warn!(error = ?e, response = %text, "Failed to parse price response");
            FetchError::MalformedResponse(format!(
                "Failed to parse JSON response for {name}: {e}"
            ))
        })?;

        let lowest_price = match data.lowest_price {
            Some(price) if !price.trim().is_empty() => price,
            _ => {
                warn!(response = %text, "Lowest price not found for product: {}", name);
                return Err(FetchError::NotFound(name.to_string()));
            }
        };

        let price = normalize_price(&lowest_price)
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite())
            .ok_or_else(|| FetchError::ParseError {
                name: name.to_string(),
                value: lowest_price.clone(),
            })?;

        let product = ProductPrice::new(name, price)
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;
        debug!("Fetched price for {}: {}", name, product.price());
        Ok(product)
    }
}
