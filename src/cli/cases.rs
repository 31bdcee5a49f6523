use super::ui;
use crate::core::currency::ExchangeRateProvider;
use crate::core::error::FetchError;
use crate::core::price::{PRICE_CURRENCY, PriceProvider, ProductPrice};
use crate::providers::{Freshness, Lookup, PriceCacheService};
use anyhow::Result;
use comfy_table::Cell;
use futures::future::join_all;

pub fn display_catalog(results: &[(String, Result<Lookup<ProductPrice>, FetchError>)]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Case"),
        ui::header_cell(&format!("Price ({PRICE_CURRENCY})")),
    ]);

    for (case_name, result) in results {
        match result {
            Ok(lookup) => {
                let stale = lookup.freshness == Freshness::Stale;
                table.add_row(vec![
                    Cell::new(format!("{case_name}{}", ui::stale_marker(stale))),
                    ui::amount_cell(lookup.value.price()),
                ]);
            }
            Err(_) => {
                table.add_row(vec![Cell::new(case_name), ui::na_cell()]);
            }
        }
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    let mut output = format!(
        "{}\n\n{}",
        ui::style_text("Cases", ui::StyleType::Title),
        table
    );
    if failed > 0 {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("{failed} of {} prices unavailable", results.len()),
                ui::StyleType::Error
            )
        ));
    }
    output
}

/// Renders the case catalog with current prices.
pub async fn run<P, X>(service: &PriceCacheService<P, X>, cases: &[String]) -> Result<String>
where
    P: PriceProvider,
    X: ExchangeRateProvider,
{
    let pb = ui::new_progress_bar(cases.len() as u64, true);
    pb.set_message("Fetching prices...");

    let price_futures = cases.iter().map(|case_name| {
        let pb_clone = pb.clone();
        async move {
            let res = service.lookup_product_price(case_name).await;
            pb_clone.inc(1);
            (case_name.clone(), res)
        }
    });
    let results = join_all(price_futures).await;
    pb.finish_and_clear();

    Ok(display_catalog(&results))
}
