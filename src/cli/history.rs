use super::ui;
use crate::App;
use crate::core::quote::HistoryRecord;
use anyhow::Result;
use comfy_table::Cell;

pub fn render(rows: &[HistoryRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Symbol"),
        ui::header_cell("Price (USD)"),
        ui::header_cell("Price (CNY)"),
    ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.day),
            Cell::new(&row.symbol),
            Cell::new(ui::format_price(row.price_usd)),
            Cell::new(ui::format_price(row.price_cny)),
        ]);
    }
    table.to_string()
}

/// Percent change in USD between the first and last row.
pub fn change_pct(rows: &[HistoryRecord]) -> Option<f64> {
    let first = rows.first()?;
    let last = rows.last()?;
    if rows.len() < 2 || first.price_usd <= 0.0 {
        return None;
    }
    Some((last.price_usd / first.price_usd - 1.0) * 100.0)
}

pub async fn run(app: &App, symbol: Option<&str>, days: u32) -> Result<()> {
    let rows = app.engine.history(symbol, days).await;
    if rows.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "No price history recorded yet. Run `assetflow backfill` to fetch it.",
                ui::StyleType::Subtle
            )
        );
        return Ok(());
    }

    println!("{}", render(&rows));
    if symbol.is_some()
        && let Some(change) = change_pct(&rows)
    {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell(&format!("Change over {} rows", rows.len()))]);
        table.add_row(vec![ui::change_cell(change)]);
        println!("\n{table}");
    }
    Ok(())
}
