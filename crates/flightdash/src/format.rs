//! Display formatting in German locale conventions.
//!
//! `.` groups thousands, `,` separates decimals. Percentages carry one
//! decimal place.

/// Short German month names, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mär", "Apr", "Mai", "Jun", "Jul", "Aug", "Sep", "Okt", "Nov", "Dez",
];

/// Label of a calendar month (1-12).
#[must_use]
pub fn month_label(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_LABELS.get(index).copied()
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Format a count with thousands separators: `1234567` → `1.234.567`.
#[must_use]
pub fn format_count(value: u64) -> String {
    group_digits(&value.to_string())
}

/// Format a signed integer with thousands separators.
#[must_use]
pub fn format_int(value: i64) -> String {
    let grouped = group_digits(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format a signed delta with an explicit sign: `+1.200`, `-35`, `0`.
#[must_use]
pub fn format_delta(value: i64) -> String {
    if value > 0 {
        format!("+{}", format_int(value))
    } else {
        format_int(value)
    }
}

/// Format a decimal number: `1234.56` with 1 place → `1.234,6`.
#[must_use]
pub fn format_decimal(value: f64, places: usize) -> String {
    let text = format!("{:.*}", places, value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };
    let mut out = String::new();
    // Rounding can turn -0.04 into "0.0"; only keep the sign for non-zero text
    if value.is_sign_negative() && text.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// Format a percentage with one decimal place: `12.34` → `12,3 %`.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{} %", format_decimal(value, 1))
}

/// Round half away from zero to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compact rendering for KPI tiles: `1,2 M`, `45,3 K`, `999`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_compact(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{} M", format_decimal(value as f64 / 1_000_000.0, 1))
    } else if value >= 1_000 {
        format!("{} K", format_decimal(value as f64 / 1_000.0, 1))
    } else {
        value.to_string()
    }
}
