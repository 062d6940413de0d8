use super::ui;
use crate::core::allocation::{self, HoldingShare};
use crate::core::{PortfolioEngine, PortfolioSnapshot, Session, User};
use anyhow::Result;
use comfy_table::Cell;
use rust_decimal::Decimal;

fn allocation_pct(value: Decimal, total: Decimal) -> Decimal {
    if total > Decimal::ZERO {
        value / total * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Renders `user`'s value per industry with the holdings of each industry beneath it.
pub fn render_allocation(snapshot: &PortfolioSnapshot, user: &User, currency: &str) -> String {
    let industries = allocation::industry_breakdown(snapshot, user);
    let shares = allocation::holding_shares(snapshot, user);
    let total = allocation::compute_user_view(snapshot, user).value;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Industry"),
        ui::header_cell("Holding"),
        ui::header_cell("Value"),
        ui::header_cell("Allocation"),
    ]);

    for (industry, industry_total) in &industries {
        table.add_row(vec![
            Cell::new(industry),
            Cell::new(""),
            Cell::new(ui::format_money(*industry_total, currency)),
            Cell::new(format!("{}%", ui::fixed(allocation_pct(*industry_total, total), 2))),
        ]);

        // Holdings are already ordered by value
        let members = shares
            .iter()
            .filter(|s| &s.industry == industry && s.value > Decimal::ZERO);
        for HoldingShare {
            ticker, name, value, ..
        } in members
        {
            table.add_row(vec![
                Cell::new(""),
                Cell::new(format!("{ticker} ({name})")),
                Cell::new(ui::style_text(
                    &ui::format_money(*value, currency),
                    ui::StyleType::Subtle,
                )),
                ui::format_percentage_cell(allocation_pct(*value, total)),
            ]);
        }
    }

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Portfolio Allocation", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\nYour Total Value ({}): {}",
        currency,
        ui::style_text(&ui::fixed(total, 2), ui::StyleType::TotalValue)
    ));
    output
}

pub async fn run(engine: &PortfolioEngine, session: &Session, currency: &str) -> Result<()> {
    let snapshot = super::fetch_snapshot(engine, false).await;
    println!("{}", render_allocation(&snapshot, &session.user, currency));
    Ok(())
}
