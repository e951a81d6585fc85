//! Parsing and formatting of user-entered quantities and money amounts.
//!
//! Form fields arrive as free text in Brazilian notation (`"R$ 1.234,56"`).
//! The strict parsers return a [`ParseError`]; the `_or_zero` variants
//! coerce any failure to zero, which is what the order draft applies to
//! its state.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Why a numeric field could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("value is empty")]
    Empty,
    #[error("'{0}' is not a number")]
    Invalid(String),
    #[error("'{0}' is negative")]
    Negative(String),
    #[error("'{0}' is too large")]
    TooLarge(String),
}

/// Parse a whole-unit quantity.
pub fn parse_quantity(raw: &str) -> Result<u32, ParseError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }
    if let Some(rest) = s.strip_prefix('-') {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseError::Negative(s.to_string()));
        }
    }
    s.parse::<u32>()
        .map_err(|_| ParseError::Invalid(s.to_string()))
}

/// Largest amount accepted from form text.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

const CURRENCY_PREFIXES: [&str; 6] = ["R$", "US$", "BRL", "$", "€", "£"];

/// Parse a money amount written with an optional currency prefix,
/// `.` thousands separators, and a `,` decimal separator.
///
/// Input without a comma is read with `.` as the decimal point, unless it
/// contains more than one dot (`"1.234.567"`), which is read as grouping.
/// Dot grouping must use three-digit groups. Amounts above
/// [`MAX_AMOUNT`] are rejected.
pub fn parse_amount(raw: &str) -> Result<Decimal, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let (mut negative, rest) = match trimmed.strip_prefix('-') {
        Some(r) => (true, r.trim_start()),
        None => (false, trimmed),
    };
    let rest = strip_currency(rest).trim_start();
    let rest = match rest.strip_prefix('-') {
        Some(r) => {
            negative = true;
            r
        }
        None => rest,
    };
    if negative {
        return Err(ParseError::Negative(trimmed.to_string()));
    }

    let invalid = || ParseError::Invalid(trimmed.to_string());
    let compact: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(invalid());
    }

    let normalized = match compact.split_once(',') {
        None if compact.matches('.').count() > 1 => ungroup(&compact).ok_or_else(invalid)?,
        None => compact.clone(),
        Some((int_part, frac)) => {
            if frac.contains(&[',', '.'][..]) {
                return Err(invalid());
            }
            format!("{}.{}", ungroup(int_part).ok_or_else(invalid)?, frac)
        }
    };

    if !normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
        || !normalized.chars().any(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let amount = Decimal::from_str(&normalized).map_err(|_| invalid())?;
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(ParseError::TooLarge(trimmed.to_string()));
    }
    Ok(amount)
}

fn strip_currency(s: &str) -> &str {
    CURRENCY_PREFIXES
        .iter()
        .find_map(|p| s.strip_prefix(*p))
        .unwrap_or(s)
}

/// Remove `.` thousands separators from an integer part, checking that
/// every group after the first has exactly three digits.
fn ungroup(int_part: &str) -> Option<String> {
    if !int_part.contains('.') {
        return Some(int_part.to_string());
    }
    let mut groups = int_part.split('.');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }
    let mut out = first.to_string();
    for g in groups {
        if g.len() != 3 {
            return None;
        }
        out.push_str(g);
    }
    Some(out)
}

pub fn quantity_or_zero(raw: &str) -> u32 {
    parse_quantity(raw).unwrap_or(0)
}

pub fn amount_or_zero(raw: &str) -> Decimal {
    parse_amount(raw).unwrap_or(Decimal::ZERO)
}

/// Format an amount as Brazilian reais: `R$ 1.234,56`.
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (plain, String::new()),
    };
    let frac = format!("{:0<2}", frac_part);

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    format!("{}R$ {},{}", if negative { "-" } else { "" }, grouped, frac)
}
