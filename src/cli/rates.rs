use super::ui;
use crate::App;
use crate::core::quote::RateSnapshot;
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::Cell;

impl RateSnapshot {
    /// Street premium over the official rate, in percent.
    pub fn premium_pct(&self) -> f64 {
        (self.peer_to_peer_rate / self.official_rate - 1.0) * 100.0
    }

    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Rate"), ui::header_cell("Value")]);
        table.add_row(vec![
            Cell::new("Official USD/CNY"),
            ui::amount_cell(self.official_rate),
        ]);
        table.add_row(vec![
            Cell::new("P2P USDT/CNY"),
            ui::amount_cell(self.peer_to_peer_rate),
        ]);
        table.add_row(vec![Cell::new("P2P premium"), ui::change_cell(self.premium_pct())]);
        table.add_row(vec![
            Cell::new("Stablecoin parity"),
            Cell::new(format!("{:.4}", self.stablecoin_parity)),
        ]);

        format!(
            "{}\n\n{}\n{}",
            ui::style_text("Exchange rates", ui::StyleType::Title),
            table,
            ui::style_text(
                &format!(
                    "Updated {}",
                    self.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                ui::StyleType::Subtle
            )
        )
    }
}

pub fn last_refresh_line(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => format!("Last full refresh {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => "No full refresh recorded yet".to_string(),
    }
}

pub async fn run(app: &App) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let snapshot = app.engine.rate_snapshot().await;
    pb.finish_and_clear();

    println!("{}", snapshot.display_as_table());
    println!(
        "{}",
        ui::style_text(
            &last_refresh_line(app.engine.last_full_refresh()),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_premium() {
        let snapshot = RateSnapshot {
            official_rate: 7.2,
            peer_to_peer_rate: 7.38,
            stablecoin_parity: 1.0,
            updated_at: Utc::now(),
        };
        assert!((snapshot.premium_pct() - 2.5).abs() < 1e-9);
        let output = snapshot.display_as_table();
        assert!(output.contains("7.38"));
        assert!(output.contains("2.50%"));
    }

    #[test]
    fn test_last_refresh_line() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 2, 0, 0).unwrap();
        assert_eq!(
            last_refresh_line(Some(at)),
            "Last full refresh 2026-05-01 02:00:00 UTC"
        );
        assert_eq!(last_refresh_line(None), "No full refresh recorded yet");
    }
}
