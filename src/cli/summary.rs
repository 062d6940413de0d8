use super::ui;
use crate::core::allocation::{self, UserPerformance};
use crate::core::calendar;
use crate::core::{PortfolioEngine, PortfolioSnapshot, Session, User};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, CellAlignment};

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn metrics_table(
    snapshot: &PortfolioSnapshot,
    user: &User,
    perf: &UserPerformance,
    currency: &str,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);

    table.add_row(vec![
        Cell::new("Your Portfolio Value"),
        Cell::new(ui::style_text(
            &ui::format_money(perf.value, currency),
            ui::StyleType::TotalValue,
        ))
        .set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Portfolio Share"),
        Cell::new(format!("{}%", ui::fixed(user.ownership_pct, 2)))
            .set_alignment(CellAlignment::Right),
    ]);

    let total_return = match (perf.total_return, perf.total_return_pct) {
        (Some(amount), Some(pct)) => format!(
            "{} ({})",
            ui::format_money_change(amount, currency),
            ui::format_change_pct(pct)
        ),
        (Some(amount), None) => ui::format_money_change(amount, currency),
        _ => "N/A".to_string(),
    };
    table.add_row(vec![
        Cell::new("Total Return"),
        Cell::new(total_return).set_alignment(CellAlignment::Right),
    ]);

    let daily = match perf.daily_change_pct {
        Some(pct) => format!(
            "{} ({})",
            ui::format_money_change(perf.daily_change, currency),
            ui::format_change_pct(pct)
        ),
        None => ui::format_money_change(perf.daily_change, currency),
    };
    table.add_row(vec![
        Cell::new("Daily Change"),
        Cell::new(daily).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Live Prices"),
        Cell::new(format!(
            "{}/{}",
            snapshot.live_count(),
            snapshot.market_priced_count()
        ))
        .set_alignment(CellAlignment::Right),
    ]);

    table.to_string()
}

/// Renders the headline figures of `user`'s share.
pub fn render_summary(
    snapshot: &PortfolioSnapshot,
    user: &User,
    currency: &str,
    now: DateTime<Utc>,
) -> String {
    let perf = allocation::performance(snapshot, user);

    let mut output = format!(
        "Portfolio Overview - {}\n\n",
        ui::style_text(&title_case(&user.username), ui::StyleType::Title)
    );

    if calendar::is_weekend_in_new_york(now) {
        output.push_str(&ui::style_text(
            "It's the weekend. No trading today, but here's the latest available data.",
            ui::StyleType::Subtle,
        ));
        output.push_str("\n\n");
    }

    let failed = snapshot.failed_tickers();
    if !failed.is_empty() {
        output.push_str(&ui::style_text(
            &format!(
                "Could not fetch live prices for {} symbols. Using default prices: {}",
                failed.len(),
                failed.join(", ")
            ),
            ui::StyleType::Warning,
        ));
        output.push_str("\n\n");
    }

    output.push_str(&metrics_table(snapshot, user, &perf, currency));
    output.push_str(&format!(
        "\n\n{}",
        ui::style_text(
            &format!(
                "Prices as of {}",
                snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            ui::StyleType::Subtle
        )
    ));
    output
}

pub async fn run(engine: &PortfolioEngine, session: &Session, currency: &str) -> Result<()> {
    let snapshot = super::fetch_snapshot(engine, false).await;
    println!(
        "{}",
        render_summary(&snapshot, &session.user, currency, Utc::now())
    );
    Ok(())
}
