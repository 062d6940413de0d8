use super::ui;
use crate::core::allocation;
use crate::core::{HistoricalPeriod, PortfolioEngine, PortfolioSnapshot};
use anyhow::Result;
use comfy_table::Cell;

/// Renders each position's change over `period`, best performer first.
pub fn render_returns(snapshot: &PortfolioSnapshot, period: HistoricalPeriod) -> String {
    let returns = allocation::position_returns(snapshot, period);

    let mut output = format!(
        "{}\n\n",
        ui::style_text(
            &format!("Position Returns - {}", period.label()),
            ui::StyleType::Title
        )
    );

    if returns.positions.is_empty() {
        output.push_str(&format!(
            "No {} data available (all using default prices)",
            period.label().to_lowercase()
        ));
        return output;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell(&format!("Return ({period})")),
    ]);
    for position in &returns.positions {
        table.add_row(vec![
            Cell::new(&position.ticker),
            Cell::new(&position.name),
            ui::change_cell(position.change_pct),
        ]);
    }

    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\nGainers: {}  Losers: {}  Unchanged: {}",
        returns.gainers, returns.losers, returns.unchanged
    ));
    output
}

pub async fn run(engine: &PortfolioEngine, period: HistoricalPeriod) -> Result<()> {
    let snapshot = super::fetch_snapshot(engine, false).await;
    println!("{}", render_returns(&snapshot, period));
    Ok(())
}
