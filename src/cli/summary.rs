use super::ui;
use crate::App;
use crate::core::asset::distinct_symbols;
use crate::core::portfolio::{Dashboard, build_dashboard};
use crate::core::quote::ReadMode;
use anyhow::Result;
use comfy_table::Cell;

impl Dashboard {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Asset"),
            ui::header_cell("Category"),
            ui::header_cell("Amount"),
            ui::header_cell("Price (USD)"),
            ui::header_cell("Value (USD)"),
            ui::header_cell("Value (CNY)"),
            ui::header_cell("Status"),
        ]);

        for item in &self.assets {
            let amount = format!("{} {}", item.asset.amount, item.asset.unit);
            let price = item.price.as_ref();
            table.add_row(vec![
                Cell::new(&item.asset.name),
                Cell::new(&item.asset.category),
                Cell::new(amount),
                ui::format_optional_cell(price.map(|q| q.price_usd), ui::format_price),
                ui::format_optional_cell(price.map(|_| item.value_usd), |v| format!("{v:.2}")),
                ui::format_optional_cell(price.map(|_| item.value_cny), |v| format!("{v:.2}")),
                ui::status_cell(price),
            ]);
        }

        let mut categories = ui::new_styled_table();
        categories.set_header(vec![
            ui::header_cell("Category"),
            ui::header_cell("Assets"),
            ui::header_cell("Total (USD)"),
            ui::header_cell("Total (CNY)"),
        ]);
        for (name, total) in &self.by_category {
            categories.add_row(vec![
                Cell::new(name),
                Cell::new(total.asset_count),
                ui::amount_cell(total.total_usd),
                ui::amount_cell(total.total_cny),
            ]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Portfolio", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str("\n\n");
        output.push_str(&categories.to_string());

        output.push_str(&format!(
            "\n\nTotal Value ({}): {}",
            ui::style_text("USD", ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.total_usd), ui::StyleType::TotalValue)
        ));
        output.push_str(&format!(
            "\nTotal Value ({}): {}",
            ui::style_text("CNY", ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.total_cny), ui::StyleType::TotalValue)
        ));

        let unpriced = self.unpriced().count();
        if unpriced > 0 {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(
                    &format!(
                        "{unpriced} asset(s) have no cached price and are excluded from totals. Run `assetflow prices` to fetch them."
                    ),
                    ui::StyleType::Warning
                )
            ));
        }
        output
    }
}

/// Dashboard from cached prices only. Never touches the network.
pub async fn run(app: &App) -> Result<()> {
    let assets = app.registry.list_assets()?;
    let symbols = distinct_symbols(&assets, &[]);
    let prices = app.engine.resolve_all(&symbols, ReadMode::CacheOnly).await;

    let dashboard = build_dashboard(&assets, prices);
    println!("{}", dashboard.display_as_table());
    Ok(())
}
