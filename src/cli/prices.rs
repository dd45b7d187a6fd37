use super::ui;
use crate::App;
use crate::core::quote::{PriceQuote, ReadMode};
use anyhow::Result;
use comfy_table::Cell;
use std::collections::HashMap;

pub fn render(symbols: &[String], prices: &HashMap<String, PriceQuote>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Price (USD)"),
        ui::header_cell("Price (CNY)"),
        ui::header_cell("Source"),
        ui::header_cell("Status"),
        ui::header_cell("Updated"),
    ]);

    for symbol in symbols {
        let quote = prices.get(symbol);
        table.add_row(vec![
            Cell::new(symbol),
            ui::format_optional_cell(quote.map(|q| q.price_usd), ui::format_price),
            ui::format_optional_cell(quote.map(|q| q.price_cny), ui::format_price),
            Cell::new(quote.map_or("-", |q| q.source.as_str())),
            ui::status_cell(quote),
            Cell::new(quote.map_or("-".to_string(), |q| {
                q.cached_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
            })),
        ]);
    }
    table.to_string()
}

/// Resolves every held symbol, fetching anything older than the freshness
/// window, or everything when `refresh` is set.
pub async fn run(app: &App, refresh: bool) -> Result<()> {
    let symbols = app.symbols()?;
    let mode = if refresh {
        ReadMode::ForceRefresh
    } else {
        ReadMode::Normal
    };

    let pb = ui::new_spinner(&format!("Resolving {} prices...", symbols.len()));
    let prices = app.engine.resolve_all(&symbols, mode).await;
    pb.finish_and_clear();

    println!("{}", render(&symbols, &prices));
    let missing = symbols.len().saturating_sub(prices.len());
    if missing > 0 {
        println!(
            "\n{}",
            ui::style_text(
                &format!("{missing} symbol(s) could not be priced"),
                ui::StyleType::Error
            )
        );
    }
    Ok(())
}
