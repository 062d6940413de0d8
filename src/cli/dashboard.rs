use super::{holdings, summary, ui};
use crate::core::{PortfolioEngine, PricingPolicy, Session};
use anyhow::Result;
use chrono::Utc;
use console::Term;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Redraw, reusing the cached snapshot while it is fresh.
    Reload,
    /// Fetch every price again.
    Refresh,
    Quit,
}

fn parse_action(input: &str) -> Option<Action> {
    match input.trim().to_lowercase().as_str() {
        "" => Some(Action::Reload),
        "r" | "refresh" => Some(Action::Refresh),
        "q" | "quit" | "exit" => Some(Action::Quit),
        _ => None,
    }
}

fn refresh_hint(policy: PricingPolicy) -> String {
    let secs = policy.freshness.as_secs();
    let window = if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{secs} s")
    };
    format!("Prices are reused for {window} unless refreshed")
}

/// Interactive view that stays open and refreshes on request.
pub async fn run(engine: &PortfolioEngine, session: &Session, currency: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut force = false;

    loop {
        let snapshot = super::fetch_snapshot(engine, force).await;

        if let Err(e) = Term::stdout().clear_screen() {
            debug!("Could not clear screen: {}", e);
        }
        println!(
            "{}",
            summary::render_summary(&snapshot, &session.user, currency, Utc::now())
        );
        ui::print_separator();
        println!(
            "{}",
            holdings::render_holdings(&snapshot, &session.user, currency)
        );
        println!(
            "\n{}\n{}",
            ui::style_text(&refresh_hint(engine.policy()), ui::StyleType::Subtle),
            ui::style_text(
                "[Enter] reload  [r] refresh prices  [q] quit",
                ui::StyleType::Subtle
            )
        );

        let action = loop {
            let Some(line) = lines.next_line().await? else {
                break Action::Quit;
            };
            match parse_action(&line) {
                Some(action) => break action,
                None => println!(
                    "{}",
                    ui::style_text(&format!("Unknown command: {}", line.trim()), ui::StyleType::Error)
                ),
            }
        };

        match action {
            Action::Reload => force = false,
            Action::Refresh => force = true,
            Action::Quit => break,
        }
    }

    Ok(())
}
