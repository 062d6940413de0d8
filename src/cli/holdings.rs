use super::ui;
use crate::core::allocation;
use crate::core::{PortfolioEngine, PortfolioSnapshot, Session, User};
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};
use rust_decimal::Decimal;

/// Renders every holding scaled to `user`'s share, largest value first.
pub fn render_holdings(snapshot: &PortfolioSnapshot, user: &User, currency: &str) -> String {
    let shares = allocation::holding_shares(snapshot, user);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Industry"),
        ui::header_cell("Your Quantity"),
        ui::header_cell("Current Price"),
        ui::header_cell(&format!("Your Value ({currency})")),
        ui::header_cell("Daily Change"),
        ui::header_cell("Price Source"),
    ]);

    for share in &shares {
        let quantity = share
            .quantity
            .map_or("-".to_string(), ui::format_quantity);
        table.add_row(vec![
            Cell::new(&share.ticker),
            Cell::new(&share.name),
            Cell::new(&share.industry),
            Cell::new(quantity).set_alignment(CellAlignment::Right),
            ui::money_cell(share.price, currency),
            Cell::new(ui::fixed(share.value, 2)).set_alignment(CellAlignment::Right),
            ui::change_cell(share.daily_change_pct),
            ui::source_cell(share.is_live),
        ]);
    }

    let cash_value: Decimal = shares
        .iter()
        .filter(|s| !s.is_market_priced)
        .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.value));

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Detailed Holdings", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\nTotal Positions: {}\nCash Position: {}\nLive Price Coverage: {}/{}",
        snapshot.market_priced_count(),
        ui::style_text(
            &ui::format_money(cash_value, currency),
            ui::StyleType::TotalLabel
        ),
        snapshot.live_count(),
        snapshot.market_priced_count()
    ));
    output
}

pub async fn run(engine: &PortfolioEngine, session: &Session, currency: &str) -> Result<()> {
    let snapshot = super::fetch_snapshot(engine, false).await;
    println!("{}", render_holdings(&snapshot, &session.user, currency));
    Ok(())
}
