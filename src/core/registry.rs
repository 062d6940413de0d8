//! Static holdings and user tables

use crate::core::error::PortfolioError;
use anyhow::{Result, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// How much of an entry the portfolio holds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Position {
    /// Market priced; valued at `price × quantity`.
    Units { quantity: Decimal },
    /// Cash-like; valued at a fixed amount and never priced.
    Fixed { value: Decimal },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StockEntry {
    pub ticker: String,
    pub name: String,
    /// Default price, used whenever no live quote is available.
    pub price: Decimal,
    #[serde(flatten)]
    pub position: Position,
    pub industry: Option<String>,
}

impl StockEntry {
    pub fn is_market_priced(&self) -> bool {
        matches!(self.position, Position::Units { .. })
    }

    pub fn quantity(&self) -> Option<Decimal> {
        match self.position {
            Position::Units { quantity } => Some(quantity),
            Position::Fixed { .. } => None,
        }
    }

    /// Value of the entry at `price`; `None` when the product does not fit a `Decimal`.
    pub fn value_at(&self, price: Decimal) -> Option<Decimal> {
        match self.position {
            Position::Units { quantity } => price.checked_mul(quantity),
            Position::Fixed { value } => Some(value),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, PartialEq)]
pub struct User {
    pub username: String,
    /// Plaintext or an argon2 PHC string.
    pub password: String,
    /// Claim on the total portfolio value, 0 to 100. Not normalized across users.
    pub ownership_pct: Decimal,
    pub initial_investment: Option<Decimal>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ownership_pct", &self.ownership_pct)
            .field("initial_investment", &self.initial_investment)
            .finish()
    }
}

/// Immutable registry of holdings and users, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Registry {
    stocks: Vec<StockEntry>,
    users: Vec<User>,
}

impl Registry {
    pub fn new(stocks: Vec<StockEntry>, users: Vec<User>) -> Result<Self> {
        let mut tickers = HashSet::new();
        for stock in &stocks {
            if !tickers.insert(stock.ticker.as_str()) {
                bail!("Duplicate ticker in holdings: {}", stock.ticker);
            }
            if stock.price.is_sign_negative() {
                bail!("Negative default price for {}", stock.ticker);
            }
            let amount = match stock.position {
                Position::Units { quantity } => quantity,
                Position::Fixed { value } => value,
            };
            if amount.is_sign_negative() {
                bail!("Negative position for {}", stock.ticker);
            }
            if stock.value_at(stock.price).is_none() {
                bail!("Position value of {} is out of range", stock.ticker);
            }
        }

        let mut usernames = HashSet::new();
        for user in &users {
            if !usernames.insert(user.username.as_str()) {
                bail!("Duplicate username: {}", user.username);
            }
            if user.ownership_pct < Decimal::ZERO || user.ownership_pct > Decimal::ONE_HUNDRED {
                bail!(
                    "Ownership percentage for {} must be within 0 and 100, got {}",
                    user.username,
                    user.ownership_pct
                );
            }
        }

        Ok(Self { stocks, users })
    }

    /// Holdings in configured order.
    pub fn list_stocks(&self) -> &[StockEntry] {
        &self.stocks
    }

    pub fn list_users(&self) -> &[User] {
        &self.users
    }

    pub fn find_user(&self, username: &str) -> Result<&User, PortfolioError> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .ok_or_else(|| PortfolioError::UserNotFound(username.to_string()))
    }

    pub fn find_stock(&self, ticker: &str) -> Result<&StockEntry, PortfolioError> {
        self.stocks
            .iter()
            .find(|s| s.ticker == ticker)
            .ok_or_else(|| PortfolioError::TickerNotInRegistry(ticker.to_string()))
    }
}
