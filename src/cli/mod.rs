//! Terminal presentation of the portfolio views

pub mod alloc;
pub mod dashboard;
pub mod holdings;
pub mod login;
pub mod returns;
pub mod setup;
pub mod summary;
pub mod ui;

use crate::core::{PortfolioEngine, PortfolioSnapshot};
use std::sync::Arc;

/// Refreshes the snapshot behind a progress bar that follows the provider calls.
pub async fn fetch_snapshot(engine: &PortfolioEngine, force: bool) -> Arc<PortfolioSnapshot> {
    let priced = engine
        .registry()
        .list_stocks()
        .iter()
        .filter(|s| s.is_market_priced())
        .count();

    let pb = ui::new_progress_bar(priced as u64, true);
    pb.set_message("Fetching prices...");
    let snapshot = engine
        .refresh_snapshot_with_progress(force, &|ticker| {
            pb.set_message(format!("Fetched price for {ticker}"));
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();
    snapshot
}
