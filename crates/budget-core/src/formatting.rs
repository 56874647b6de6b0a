//! Number and money formatting shared by the console and workbook reports.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency symbol used for every monetary figure.
pub const CURRENCY_SYMBOL: &str = "$";

/// Excel number format matching [`format_currency`].
pub const CURRENCY_NUM_FORMAT: &str = "\"$\"#,##0.00;-\"$\"#,##0.00";

/// Excel number format for signed PC counts.
pub const COUNT_NUM_FORMAT: &str = "#,##0;-#,##0";

/// Format a decimal with thousands separators and exactly `decimals` places.
///
/// Rounds half away from zero.
///
/// # Examples
///
/// ```
/// use budget_core::formatting::format_number;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_number(Decimal::new(12345, 1), 1), "1,234.5");
/// assert_eq!(format_number(Decimal::from(1_234_567), 0), "1,234,567");
/// assert_eq!(format_number(Decimal::ZERO, 2), "0.00");
/// assert_eq!(format_number(Decimal::new(-98765, 1), 1), "-9,876.5");
/// ```
pub fn format_number(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let digits = format!("{:.prec$}", rounded.abs(), prec = decimals as usize);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits.as_str(), None),
    };

    let mut result = group_thousands(int_part);
    if let Some(frac) = frac_part {
        result.push('.');
        result.push_str(frac);
    }

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a monetary amount with the currency symbol, two decimal places and
/// thousands separators. The sign goes before the symbol.
///
/// # Examples
///
/// ```
/// use budget_core::formatting::format_currency;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_currency(Decimal::new(123456, 2)), "$1,234.56");
/// assert_eq!(format_currency(Decimal::ZERO), "$0.00");
/// assert_eq!(format_currency(Decimal::from(-5000)), "-$5,000.00");
/// ```
pub fn format_currency(amount: Decimal) -> String {
    let body = format_number(amount.abs(), 2);
    if amount.is_sign_negative() && body != "0.00" {
        format!("-{}{}", CURRENCY_SYMBOL, body)
    } else {
        format!("{}{}", CURRENCY_SYMBOL, body)
    }
}

/// Format a signed currency change with an explicit `+` for gains.
///
/// ```
/// use budget_core::formatting::format_signed_currency;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_signed_currency(Decimal::from(1500)), "+$1,500.00");
/// assert_eq!(format_signed_currency(Decimal::from(-20)), "-$20.00");
/// ```
pub fn format_signed_currency(amount: Decimal) -> String {
    let formatted = format_currency(amount);
    if amount > Decimal::ZERO {
        format!("+{}", formatted)
    } else {
        formatted
    }
}

/// Format a PC count with thousands separators.
pub fn format_count(count: i64) -> String {
    let grouped = group_thousands(&count.unsigned_abs().to_string());
    if count < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a percentage with one decimal place and an explicit sign.
///
/// ```
/// use budget_core::formatting::format_percent_change;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_percent_change(Decimal::new(125, 1)), "+12.5%");
/// assert_eq!(format_percent_change(Decimal::new(-3, 0)), "-3.0%");
/// ```
pub fn format_percent_change(pct: Decimal) -> String {
    let body = format_number(pct, 1);
    if pct > Decimal::ZERO {
        format!("+{}%", body)
    } else {
        format!("{}%", body)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
