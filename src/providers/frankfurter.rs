use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use crate::core::config::FrankfurterProviderConfig;
use crate::core::currency::{Currency, ExchangeRateProvider, ExchangeTable};
use crate::core::error::FetchError;

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    base: Option<String>,
    rates: HashMap<String, serde_json::Value>,
}

/// Exchange rates for a single fixed base currency.
pub struct FrankfurterProvider {
    endpoint: Url,
    base: Currency,
}

impl FrankfurterProvider {
    pub fn new(config: &FrankfurterProviderConfig, base: Currency) -> anyhow::Result<Self> {
        let mut endpoint = Url::parse(&format!(
            "{}/latest",
            config.base_url.trim_end_matches('/')
        ))
        .with_context(|| format!("Invalid exchange rate base URL: {}", config.base_url))?;
        endpoint.query_pairs_mut().append_pair("base", base.code());

        Ok(Self { endpoint, base })
    }

    pub fn base(&self) -> Currency {
        self.base
    }
}

fn parse_exchange_table(text: &str, requested: Currency) -> Result<ExchangeTable, FetchError> {
    let root: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| FetchError::MalformedResponse(format!("Failed to parse JSON response: {e}")))?;

    if let Some(error_type) = root.get("error-type") {
        return Err(FetchError::Upstream(
            error_type.as_str().unwrap_or("unknown").to_string(),
        ));
    }

    let data: LatestRatesResponse = serde_json::from_value(root)
        .map_err(|e| FetchError::MalformedResponse(format!("Unexpected rates response: {e}")))?;

    let base = match data.base {
        Some(code) => code
            .parse::<Currency>()
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?,
        None => requested,
    };

    let rates: HashMap<Currency, f64> = data
        .rates
        .iter()
        .filter_map(|(code, rate)| match code.parse::<Currency>() {
            Ok(currency) if currency != base => Some((currency, rate)),
            Ok(_) => None,
            Err(_) => {
                debug!("Ignoring unknown currency in rates response: {}", code);
                None
            }
        })
        .map(|(currency, rate)| -> Result<(Currency, f64), FetchError> {
            let value = rate.as_f64().ok_or_else(|| {
                FetchError::MalformedResponse(format!("Rate for {currency} is not a number: {rate}"))
            })?;
            Ok((currency, value))
        })
        .collect::<Result<_, _>>()?;

    ExchangeTable::new(base, rates).map_err(|e| FetchError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl ExchangeRateProvider for FrankfurterProvider {
    #[instrument(skip(self))]
    async fn fetch_exchange_table(&self) -> Result<ExchangeTable, FetchError> {
        debug!("Requesting exchange rates from {}", self.endpoint);

        let client = reqwest::Client::builder()
            .user_agent("caseprice/1.0")
            .build()?;
        let response = client.get(self.endpoint.clone()).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Upstream(format!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                self.base
            )));
        }

        let text = response.text().await?;
        let table = parse_exchange_table(&text, self.base).inspect_err(|e| {
            warn!(error = %e, response = %text, "Failed to read exchange rates");
        })?;
        debug!("Fetched exchange rates: {:?}", table);
        Ok(table)
    }
}
