use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::{Decimal, RoundingStrategy};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Warning,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Warning => style(text).yellow(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Rounds half away from zero and pads to exactly `dp` decimals.
pub fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// Formats an amount with two decimals followed by the currency code.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    format!("{} {currency}", fixed(amount, 2))
}

/// Like [`format_money`] but always signed.
pub fn format_money_change(amount: Decimal, currency: &str) -> String {
    format!("{} {currency}", signed(amount, 2))
}

/// Signed percentage with two decimals, e.g. `+1.25%`.
pub fn format_change_pct(change: Decimal) -> String {
    format!("{}%", signed(change, 2))
}

fn signed(value: Decimal, dp: u32) -> String {
    let text = fixed(value.abs(), dp);
    if value.is_sign_negative() && !value.is_zero() {
        format!("-{text}")
    } else {
        format!("+{text}")
    }
}

/// Quantities below 1000 keep two decimals, larger ones are rounded.
pub fn format_quantity(quantity: Decimal) -> String {
    if quantity < Decimal::ONE_THOUSAND {
        fixed(quantity, 2)
    } else {
        fixed(quantity, 0)
    }
}

pub fn money_cell(amount: Decimal, currency: &str) -> Cell {
    Cell::new(format_money(amount, currency)).set_alignment(CellAlignment::Right)
}

/// Formats a cell with bold and green text
pub fn format_percentage_cell(value: Decimal) -> Cell {
    Cell::new(format!("{}%", fixed(value, 2)))
        .add_attribute(Attribute::Bold)
        .fg(Color::Green)
        .set_alignment(CellAlignment::Right)
}

/// Creates a cell for displaying percentage change with color coding.
pub fn change_cell(change: Decimal) -> Cell {
    let color = if change > Decimal::ZERO {
        Color::Green
    } else if change < Decimal::ZERO {
        Color::Red
    } else {
        Color::DarkGrey
    };
    Cell::new(format_change_pct(change))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// "Live" for fetched prices, "Default" otherwise.
pub fn source_cell(is_live: bool) -> Cell {
    if is_live {
        Cell::new("Live").fg(Color::Green)
    } else {
        Cell::new("Default").fg(Color::DarkGrey)
    }
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64, with_message: bool) -> ProgressBar {
    let template = if with_message {
        "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    } else {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    };

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(format_money(Decimal::new(1475, 1), "EUR"), "147.50 EUR");
        assert_eq!(format_money_change(Decimal::from(25), "EUR"), "+25.00 EUR");
        assert_eq!(format_money_change(Decimal::new(-1005, 1), "EUR"), "-100.50 EUR");
        assert_eq!(format_change_pct(Decimal::ZERO), "+0.00%");
        assert_eq!(format_change_pct(Decimal::new(-20, 0)), "-20.00%");
    }

    #[test]
    fn test_fixed_rounds_half_away_from_zero() {
        assert_eq!(fixed(Decimal::new(12345, 3), 2), "12.35");
        assert_eq!(fixed(Decimal::new(-12345, 3), 2), "-12.35");
        assert_eq!(fixed(Decimal::from(7), 2), "7.00");
    }

    #[test]
    fn test_quantity_formatting() {
        assert_eq!(format_quantity(Decimal::new(54, 1)), "5.40");
        assert_eq!(format_quantity(Decimal::new(813584, 1)), "81358");
    }
}
