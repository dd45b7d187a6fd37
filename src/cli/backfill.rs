use super::ui;
use crate::App;
use crate::core::asset::{Asset, distinct_symbols};
use crate::resolver::FIAT_SYMBOL;
use anyhow::Result;
use comfy_table::Cell;
use std::collections::BTreeMap;
use tracing::info;

/// Held symbols that can have a price history. The fiat symbol never does.
pub fn backfill_symbols(assets: &[Asset]) -> Vec<String> {
    distinct_symbols(assets, &[FIAT_SYMBOL])
}

pub async fn run(app: &App, days: u32) -> Result<()> {
    let symbols = backfill_symbols(&app.registry.list_assets()?);
    info!(symbols = symbols.len(), days, "Backfilling price history");

    let pb = ui::new_spinner(&format!(
        "Fetching {days} days of history for {} symbols...",
        symbols.len()
    ));
    let rows = app.engine.backfill_history(&symbols, days).await;
    pb.finish_and_clear();

    let mut per_symbol: BTreeMap<&str, usize> =
        symbols.iter().map(|s| (s.as_str(), 0)).collect();
    for row in &rows {
        *per_symbol.entry(row.symbol.as_str()).or_default() += 1;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Symbol"), ui::header_cell("Rows")]);
    for (symbol, count) in &per_symbol {
        let cell = if *count == 0 {
            Cell::new("none").fg(comfy_table::Color::DarkGrey)
        } else {
            Cell::new(count)
        };
        table.add_row(vec![Cell::new(symbol), cell]);
    }
    println!("{table}");
    println!(
        "\n{} {}",
        ui::style_text("Stored rows:", ui::StyleType::TotalLabel),
        ui::style_text(&rows.len().to_string(), ui::StyleType::TotalValue)
    );
    Ok(())
}
