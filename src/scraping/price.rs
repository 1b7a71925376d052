//! Price normalization
//!
//! Prices are carried as an integer count of the smallest *printed* unit.
//! `parse_price` keeps every digit and drops everything else, so thousands
//! separators and decimal separators are both discarded: `"1.234,56"` and
//! `"123456"` normalize to the same value. This is a known precision
//! trade-off for sources that print cents; it is kept as-is so that prices
//! from every strategy and every source compare on the same footing.

/// Currency prefix used when rendering prices
pub const CURRENCY_PREFIX: &str = "$";

/// Thousands separator used when rendering prices (es-CO convention)
pub const THOUSANDS_SEPARATOR: char = '.';

/// Parse a price by concatenating every ASCII digit in `text`.
///
/// Returns 0 when `text` has no digits. Values that would overflow `u64`
/// saturate at `u64::MAX`.
pub fn parse_price(text: &str) -> u64 {
    text.bytes()
        .filter(u8::is_ascii_digit)
        .fold(0u64, |acc, b| {
            acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
        })
}

/// Parse a price, treating a digit-less string as "no price".
///
/// Extraction uses this so that a node containing only a currency symbol or
/// a "see price in cart" label does not produce a zero-priced listing.
pub fn parse_price_opt(text: &str) -> Option<u64> {
    if text.chars().any(|c| c.is_ascii_digit()) {
        Some(parse_price(text))
    } else {
        None
    }
}

/// Format a price with the currency prefix and thousands grouping.
///
/// `format_price(1234567) == "$1.234.567"`.
pub fn format_price(value: u64) -> String {
    let digits = value.to_string();
    let len = digits.len();
    let mut out = String::with_capacity(CURRENCY_PREFIX.len() + len + len / 3);
    out.push_str(CURRENCY_PREFIX);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(THOUSANDS_SEPARATOR);
        }
        out.push(ch);
    }

    out
}
