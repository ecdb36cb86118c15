//! Amount normalization and formatting shared by chat replies and rendered
//! documents.
//!
//! Amounts travel as `f64` currency units. Every amount entering the system
//! passes through [`normalize_amount`], which bounds it and rounds it to
//! whole paise/cents, so stored values always convert exactly to minor units.

/// Largest accepted amount. Its minor units stay well inside the range an
/// `f64` holds exactly.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// Round an amount to two decimals, rejecting non-positive, non-finite and
/// out-of-range values.
pub fn normalize_amount(amount: f64) -> Option<f64> {
    if !amount.is_finite() || amount <= 0.0 || amount > MAX_AMOUNT {
        return None;
    }
    Some(to_minor_units(amount) as f64 / 100.0)
}

/// Whole paise/cents for a normalized amount.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Format an amount with two decimals and thousands separators.
///
/// Rupee amounts use Indian digit grouping (`₹1,50,000.00`); every other
/// symbol uses groups of three.
pub fn format_amount(amount: f64, symbol: &str) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = if symbol == "₹" {
        group_indian(whole)
    } else {
        group_thousands(whole)
    };

    format!(
        "{}{}{}.{}",
        if negative { "-" } else { "" },
        symbol,
        grouped,
        frac
    )
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last3) = digits.split_at(digits.len() - 3);
    let mut out = String::new();
    for (i, ch) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(last3);
    out
}
