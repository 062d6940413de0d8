//! Per-user views over a portfolio snapshot.
//!
//! Every function here is pure: it reads a [`PortfolioSnapshot`] and a [`User`] and never
//! touches the provider or the cache.

use crate::core::engine::PortfolioSnapshot;
use crate::core::price::HistoricalPeriod;
use crate::core::registry::{StockEntry, User};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A user's claim on the whole portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct UserView {
    pub username: String,
    pub value: Decimal,
    pub pct: Decimal,
}

pub fn compute_user_view(snapshot: &PortfolioSnapshot, user: &User) -> UserView {
    UserView {
        username: user.username.clone(),
        value: share_of(snapshot.total_value, user.ownership_pct),
        pct: user.ownership_pct,
    }
}

// pct is at most 100, so scaling down first cannot overflow.
fn share_of(amount: Decimal, pct: Decimal) -> Decimal {
    amount / Decimal::ONE_HUNDRED * pct
}

/// Percentage change from `reference` to `current`; `None` when the reference is zero or the
/// change is out of range.
pub fn percent_change(current: Decimal, reference: Decimal) -> Option<Decimal> {
    if reference.is_zero() {
        return None;
    }
    current
        .checked_sub(reference)?
        .checked_div(reference)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

pub fn industry_label(stock: &StockEntry) -> &str {
    stock.industry.as_deref().unwrap_or("Cash")
}

/// One holding scaled to a user's ownership percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingShare {
    pub ticker: String,
    pub name: String,
    pub industry: String,
    /// `None` for fixed-value entries.
    pub quantity: Option<Decimal>,
    pub price: Decimal,
    pub value: Decimal,
    pub daily_change_pct: Decimal,
    /// Change against the configured default price, zero unless the quote is live.
    pub price_change_pct: Decimal,
    pub is_live: bool,
    pub is_market_priced: bool,
}

/// Holdings scaled to the user's share, largest value first.
pub fn holding_shares(snapshot: &PortfolioSnapshot, user: &User) -> Vec<HoldingShare> {
    let pct = user.ownership_pct;
    let mut shares: Vec<HoldingShare> = snapshot
        .entries
        .iter()
        .map(|entry| {
            let quote = &entry.quote;
            let daily_change_pct = quote
                .previous_close()
                .and_then(|prev| percent_change(quote.price, prev))
                .unwrap_or(Decimal::ZERO);
            let price_change_pct = if quote.is_live {
                percent_change(quote.price, entry.stock.price).unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ZERO
            };

            HoldingShare {
                ticker: entry.stock.ticker.clone(),
                name: entry.stock.name.clone(),
                industry: industry_label(&entry.stock).to_string(),
                quantity: entry.stock.quantity().map(|q| share_of(q, pct)),
                price: quote.price,
                value: share_of(entry.value, pct),
                daily_change_pct,
                price_change_pct,
                is_live: quote.is_live,
                is_market_priced: entry.stock.is_market_priced(),
            }
        })
        .collect();

    shares.sort_by(|a, b| b.value.cmp(&a.value));
    shares
}

/// User's value per industry, largest first. Zero totals are dropped.
pub fn industry_breakdown(snapshot: &PortfolioSnapshot, user: &User) -> Vec<(String, Decimal)> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    for entry in &snapshot.entries {
        let total = totals.entry(industry_label(&entry.stock)).or_default();
        *total = total.saturating_add(share_of(entry.value, user.ownership_pct));
    }

    let mut breakdown: Vec<(String, Decimal)> = totals
        .into_iter()
        .filter(|(_, value)| *value > Decimal::ZERO)
        .map(|(industry, value)| (industry.to_string(), value))
        .collect();
    breakdown.sort_by(|(a_name, a), (b_name, b)| b.cmp(a).then_with(|| a_name.cmp(b_name)));
    breakdown
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserPerformance {
    pub value: Decimal,
    pub initial_investment: Option<Decimal>,
    pub total_return: Option<Decimal>,
    pub total_return_pct: Option<Decimal>,
    pub daily_change: Decimal,
    pub daily_change_pct: Option<Decimal>,
}

pub fn performance(snapshot: &PortfolioSnapshot, user: &User) -> UserPerformance {
    let value = compute_user_view(snapshot, user).value;

    let daily_change: Decimal = snapshot
        .entries
        .iter()
        .filter_map(|entry| {
            let quantity = entry.stock.quantity()?;
            let prev = entry.quote.previous_close()?;
            let change = entry.quote.price.checked_sub(prev)?.checked_mul(quantity)?;
            Some(share_of(change, user.ownership_pct))
        })
        .fold(Decimal::ZERO, |acc, change| acc.saturating_add(change));
    let daily_change_pct = (value > Decimal::ZERO)
        .then(|| daily_change.checked_div(value)?.checked_mul(Decimal::ONE_HUNDRED))
        .flatten();

    let initial_investment = user.initial_investment;
    let total_return = initial_investment.and_then(|initial| value.checked_sub(initial));
    let total_return_pct = initial_investment.and_then(|initial| percent_change(value, initial));

    UserPerformance {
        value,
        initial_investment,
        total_return,
        total_return_pct,
        daily_change,
        daily_change_pct,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionReturn {
    pub ticker: String,
    pub name: String,
    pub change_pct: Decimal,
    pub is_live: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionReturns {
    pub period: HistoricalPeriod,
    pub positions: Vec<PositionReturn>,
    pub gainers: usize,
    pub losers: usize,
    pub unchanged: usize,
}

/// Change of each market-priced holding over `period`, best performer first.
///
/// Holdings without a live quote are only listed when they still moved by more than 0.01%.
pub fn position_returns(snapshot: &PortfolioSnapshot, period: HistoricalPeriod) -> PositionReturns {
    let threshold = Decimal::new(1, 2);
    let mut positions: Vec<PositionReturn> = snapshot
        .entries
        .iter()
        .filter(|entry| entry.stock.is_market_priced())
        .map(|entry| PositionReturn {
            ticker: entry.stock.ticker.clone(),
            name: entry.stock.name.clone(),
            change_pct: entry
                .quote
                .reference_prices
                .get(&period)
                .and_then(|reference| percent_change(entry.quote.price, *reference))
                .unwrap_or(Decimal::ZERO),
            is_live: entry.quote.is_live,
        })
        .filter(|p| p.is_live || p.change_pct.abs() > threshold)
        .collect();
    positions.sort_by(|a, b| b.change_pct.cmp(&a.change_pct));

    let gainers = positions.iter().filter(|p| p.change_pct > Decimal::ZERO).count();
    let losers = positions.iter().filter(|p| p.change_pct < Decimal::ZERO).count();
    let unchanged = positions.len() - gainers - losers;

    PositionReturns {
        period,
        positions,
        gainers,
        losers,
        unchanged,
    }
}
