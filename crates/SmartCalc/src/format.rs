//! Culture-aware number parsing and result rendering.

use std::fmt::Write;
use std::str::FromStr;

use rust_decimal::Decimal;
use smart_calc_support::{Data, DataValue};

use crate::resources::Grammar;

/// Fractional digits kept when rendering a result.
pub const DISPLAY_DECIMALS: u32 = 10;

/// Parses a number written with the culture's separators (`1,234.5`, `1 234,5`).
pub fn parse_number(grammar: &Grammar, text: &str) -> Option<Decimal> {
    let mut plain = text.trim().to_string();
    if !grammar.group_separator.is_empty() {
        plain = plain.replace(&grammar.group_separator, "");
    }
    if grammar.decimal_separator != "." {
        plain = plain.replace(&grammar.decimal_separator, ".");
    }
    if plain.is_empty() || !plain.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    Decimal::from_str(&plain).ok()
}

/// Renders a number with the culture's separators and at most [`DISPLAY_DECIMALS`]
/// fractional digits.
pub fn format_decimal(grammar: &Grammar, value: Decimal) -> String {
    let rounded = value.round_dp(DISPLAY_DECIMALS).normalize();
    if rounded.is_zero() {
        return "0".to_string();
    }

    let plain = rounded.abs().to_string();
    let (integer, fraction) = match plain.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (plain.as_str(), None),
    };

    let mut out = String::with_capacity(plain.len() + 4);
    if rounded.is_sign_negative() {
        out.push('-');
    }
    let digits = integer.len();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push_str(&grammar.group_separator);
        }
        out.push(c);
    }
    if let Some(fraction) = fraction {
        out.push_str(&grammar.decimal_separator);
        out.push_str(fraction);
    }
    out
}

/// Renders a data value for display.
pub fn format_data(grammar: &Grammar, data: &Data) -> String {
    match data.value() {
        DataValue::Number(value) => format_decimal(grammar, *value),
        DataValue::Percentage(percentage) => format!("{}%", format_decimal(grammar, percentage.0)),
        DataValue::Quantity(quantity) => format!(
            "{} {}",
            format_decimal(grammar, quantity.value),
            quantity.unit.symbol
        ),
        DataValue::Currency(amount) => {
            format!("{} {}", format_decimal(grammar, amount.amount), amount.iso)
        }
        DataValue::Date(date) => {
            let mut out = String::new();
            if write!(out, "{}", date.format(&grammar.display_date_format)).is_err() {
                out = date.format("%Y-%m-%d").to_string();
            }
            out
        }
        DataValue::Boolean(true) => grammar.true_text.clone(),
        DataValue::Boolean(false) => grammar.false_text.clone(),
        DataValue::Error(error) => grammar.message(error.message_key()).to_string(),
    }
}
