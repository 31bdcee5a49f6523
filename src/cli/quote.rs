use super::ui;
use crate::core::bundle::{BundleQuote, quote_bundles};
use crate::core::currency::{Currency, ExchangeRateProvider};
use crate::core::price::{PRICE_CURRENCY, PriceProvider};
use crate::providers::{Freshness, PriceCacheService};
use anyhow::Result;
use comfy_table::Cell;
use futures::future::join_all;
use tracing::{debug, warn};

/// Parses a user-typed amount, accepting `,` as decimal separator and
/// embedded spaces.
pub fn parse_amount(text: &str) -> Result<f64, String> {
    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if normalized.is_empty() {
        return Err("amount cannot be empty".to_string());
    }
    let amount = normalized
        .parse::<f64>()
        .map_err(|_| format!("invalid amount: {text}"))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("amount must be a non-negative number: {text}"));
    }
    Ok(amount)
}

#[derive(Debug)]
pub struct QuotedCase {
    pub quote: BundleQuote,
    /// True when either input came from an expired cache entry
    pub stale: bool,
}

/// Looks up the case price and the exchange rates concurrently and only
/// computes the quote once both succeeded.
pub async fn quote_case<P, X>(
    service: &PriceCacheService<P, X>,
    case_name: &str,
    amount: f64,
    currency: Currency,
    key_price: f64,
) -> Result<QuotedCase>
where
    P: PriceProvider,
    X: ExchangeRateProvider,
{
    let (case, table) = tokio::try_join!(
        service.lookup_product_price(case_name),
        service.lookup_exchange_table()
    )?;
    let stale = case.freshness == Freshness::Stale || table.freshness == Freshness::Stale;
    debug!(
        "Quoting {} with case data {:?} and rates {:?}",
        case_name, case.freshness, table.freshness
    );

    let quote = quote_bundles(amount, currency, &case.value, key_price, &table.value)?;
    Ok(QuotedCase { quote, stale })
}

pub fn display_quotes(
    results: &[(String, Result<QuotedCase>)],
    amount: f64,
    currency: Currency,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Case"),
        ui::header_cell(&format!("Case ({PRICE_CURRENCY})")),
        ui::header_cell(&format!("Key ({PRICE_CURRENCY})")),
        ui::header_cell(&format!("Bundle ({PRICE_CURRENCY})")),
        ui::header_cell("Cases"),
        ui::header_cell("Keys"),
        ui::header_cell(&format!("Remaining ({currency})")),
    ]);

    let mut any_stale = false;
    let mut errors = Vec::new();
    for (case_name, result) in results {
        match result {
            Ok(quoted) => {
                any_stale |= quoted.stale;
                let q = &quoted.quote;
                table.add_row(vec![
                    Cell::new(format!("{}{}", q.case_name, ui::stale_marker(quoted.stale))),
                    ui::amount_cell(q.case_price),
                    ui::amount_cell(q.key_price),
                    ui::amount_cell(q.bundle_cost),
                    ui::highlight_cell(q.bundles),
                    ui::highlight_cell(q.bundles),
                    ui::amount_cell(q.remaining),
                ]);
            }
            Err(e) => {
                table.add_row(vec![
                    Cell::new(case_name),
                    ui::na_cell(),
                    ui::na_cell(),
                    ui::na_cell(),
                    ui::na_cell(),
                    ui::na_cell(),
                    ui::na_cell(),
                ]);
                errors.push(format!("{case_name}: {e}"));
            }
        }
    }

    let mut output = format!(
        "Budget: {}\n\n",
        ui::style_text(&format!("{amount:.2} {currency}"), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());

    if any_stale {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                "* price data is out of date, the last refresh failed",
                ui::StyleType::Subtle
            )
        ));
    }
    for error in errors {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(&error, ui::StyleType::Error)
        ));
    }
    output
}

/// Quotes every case and renders the report. Fails only when no case could
/// be quoted.
pub async fn run<P, X>(
    service: &PriceCacheService<P, X>,
    cases: &[String],
    amount: f64,
    currency: Currency,
    key_price: f64,
) -> Result<String>
where
    P: PriceProvider,
    X: ExchangeRateProvider,
{
    let quote_futures = cases.iter().map(|case_name| async move {
        let result = quote_case(service, case_name, amount, currency, key_price).await;
        if let Err(e) = &result {
            warn!(error = %e, "Quote failed for {}", case_name);
        }
        (case_name.clone(), result)
    });
    let results = join_all(quote_futures).await;

    if results.iter().all(|(_, r)| r.is_err()) {
        let reasons: Vec<String> = results
            .iter()
            .filter_map(|(case_name, r)| {
                r.as_ref().err().map(|e| format!("{case_name}: {e}"))
            })
            .collect();
        anyhow::bail!("No quote could be computed\n{}", reasons.join("\n"));
    }
    Ok(display_quotes(&results, amount, currency))
}
