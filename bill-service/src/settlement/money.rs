//! Number parsing, rounding and fraction formatting for bill quantities and prices.
//!
//! All quantities are [`Decimal`]s in the bill's currency unit. Rounding is to
//! one decimal place, half away from zero, so repeated increments and
//! decrements stay stable.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Leading numeric prefix, as a lenient float parser would accept it.
static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?)(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?")
        .expect("Failed to compile numeric prefix pattern")
});

static FIRST_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("Failed to compile URL pattern"));

/// Largest denominator tried when rendering a fraction.
const MAX_DENOMINATOR: u64 = 1000;

/// Result of parsing user-entered numeric text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedNumber {
    Parsed(Decimal),
    /// Input that did not start with a finite number, returned unchanged.
    Unparsed(String),
}

impl ParsedNumber {
    /// The parsed value, or `fallback` when parsing failed.
    pub fn or(self, fallback: Decimal) -> Decimal {
        match self {
            ParsedNumber::Parsed(value) => value,
            ParsedNumber::Unparsed(_) => fallback,
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            ParsedNumber::Parsed(value) => Some(*value),
            ParsedNumber::Unparsed(_) => None,
        }
    }
}

/// Parse a decimal that may use a comma as separator.
///
/// Like a lenient float parser, only the leading numeric prefix is read
/// (`"12abc"` parses as 12). Anything that does not start with a finite number
/// comes back as [`ParsedNumber::Unparsed`] holding the original input.
pub fn try_parse_decimal(input: &str) -> ParsedNumber {
    let normalized = input.replace(',', ".");

    NUMERIC_PREFIX
        .captures(normalized.trim_start())
        .and_then(|caps| {
            let negative = caps.get(1).map(|m| m.as_str() == "-").unwrap_or(false);
            let body = caps.get(2)?.as_str();
            let exponent = caps.get(3).map(|m| m.as_str());
            parse_unsigned(body, exponent).map(|value| if negative { -value } else { value })
        })
        .map(ParsedNumber::Parsed)
        .unwrap_or_else(|| ParsedNumber::Unparsed(input.to_string()))
}

fn parse_unsigned(body: &str, exponent: Option<&str>) -> Option<Decimal> {
    let body = body.strip_suffix('.').unwrap_or(body);
    let body = if body.starts_with('.') {
        format!("0{}", body)
    } else {
        body.to_string()
    };

    match exponent {
        Some(exp) => Decimal::from_scientific(&format!("{}{}", body, exp)).ok(),
        None => Decimal::from_str(&body).ok(),
    }
}

/// Drop everything except digits and separators (`"€ 12,50"` becomes `"12,50"`).
pub fn strip_currency_symbol(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect()
}

/// Apply an edited quantity such as `"2x"`, keeping `current` if it does not parse.
pub fn update_quantity(current: Decimal, input: &str) -> Decimal {
    try_parse_decimal(&input.replace('x', "")).or(current)
}

/// Apply an edited price such as `"€ 3,40"`, keeping `current` if it does not parse.
pub fn update_price(current: Decimal, input: &str) -> Decimal {
    try_parse_decimal(&strip_currency_symbol(input)).or(current)
}

/// Round to one decimal place, half away from zero.
pub fn round(value: Decimal) -> Decimal {
    round_to(value, 1)
}

/// Round on a grid of `1 / (precision * 10)`, half away from zero.
///
/// A precision of 0 is treated as 1.
pub fn round_to(value: Decimal, precision: u32) -> Decimal {
    let factor = Decimal::from(precision.max(1)) * Decimal::TEN;

    match value.checked_mul(factor) {
        Some(scaled) => {
            scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) / factor
        }
        None => value,
    }
}

/// Render a quantity as an integer or a reduced fraction: `"2"`, `"1/3"`, `"1 1/2"`.
///
/// The fractional part is matched against denominators up to 1000 and the
/// closest one within a tight tolerance is used.
pub fn format_decimal(value: Decimal) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let sign = if value.is_sign_negative() { "-" } else { "" };
    let magnitude = value.abs();
    let mut whole = magnitude.trunc();
    let (mut numerator, denominator) = closest_fraction(magnitude - whole);

    if numerator == denominator {
        whole += Decimal::ONE;
        numerator = 0;
    }

    let whole = whole.normalize();
    match (whole.is_zero(), numerator) {
        (true, 0) => "0".to_string(),
        (false, 0) => format!("{}{}", sign, whole),
        (true, _) => format!("{}{}/{}", sign, numerator, denominator),
        (false, _) => format!("{}{} {}/{}", sign, whole, numerator, denominator),
    }
}

fn closest_fraction(fraction: Decimal) -> (u64, u64) {
    if fraction.is_zero() {
        return (0, 1);
    }

    let tolerance = Decimal::new(1, 6);
    let mut best = (0_u64, 1_u64);
    let mut best_error = fraction;

    for denominator in 1..=MAX_DENOMINATOR {
        let d = Decimal::from(denominator);
        let numerator = (fraction * d).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let error = (fraction - numerator / d).abs();

        if error < best_error {
            best = (numerator.to_u64().unwrap_or(0), denominator);
            best_error = error;
        }
        if best_error <= tolerance {
            break;
        }
    }

    let divisor = gcd(best.0, best.1);
    (best.0 / divisor, best.1 / divisor)
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a.max(1)
    } else {
        gcd(b, a % b)
    }
}

/// First `http(s)://` URL in free text, if any.
pub fn extract_first_url(text: &str) -> Option<&str> {
    FIRST_URL.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_comma_decimals() {
        assert_eq!(try_parse_decimal("12,5"), ParsedNumber::Parsed(d("12.5")));
        assert_eq!(try_parse_decimal("3.25"), ParsedNumber::Parsed(d("3.25")));
        assert_eq!(try_parse_decimal(" -0,5"), ParsedNumber::Parsed(d("-0.5")));
    }

    #[test]
    fn parses_leading_prefix_only() {
        assert_eq!(try_parse_decimal("12abc"), ParsedNumber::Parsed(d("12")));
        assert_eq!(try_parse_decimal(".5"), ParsedNumber::Parsed(d("0.5")));
        assert_eq!(try_parse_decimal("7."), ParsedNumber::Parsed(d("7")));
        assert_eq!(try_parse_decimal("1.5e2"), ParsedNumber::Parsed(d("150")));
    }

    #[test]
    fn unparseable_input_is_returned_unchanged() {
        assert_eq!(
            try_parse_decimal("abc"),
            ParsedNumber::Unparsed("abc".to_string())
        );
        assert_eq!(try_parse_decimal(""), ParsedNumber::Unparsed(String::new()));
        assert_eq!(
            try_parse_decimal("Infinity"),
            ParsedNumber::Unparsed("Infinity".to_string())
        );
    }

    #[test]
    fn edits_fall_back_to_known_good_values() {
        assert_eq!(update_quantity(d("1"), "3x"), d("3"));
        assert_eq!(update_quantity(d("1"), "x"), d("1"));
        assert_eq!(update_price(d("2.5"), "€ 4,20"), d("4.2"));
        assert_eq!(update_price(d("2.5"), "€"), d("2.5"));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round(d("0.25")), d("0.3"));
        assert_eq!(round(d("-0.25")), d("-0.3"));
        assert_eq!(round(d("2.94")), d("2.9"));
        assert_eq!(round(d("0.6666666")), d("0.7"));
        assert_eq!(round_to(d("0.26"), 2), d("0.25"));
    }

    #[test]
    fn formats_fractions() {
        assert_eq!(format_decimal(Decimal::ONE / Decimal::from(3)), "1/3");
        assert_eq!(format_decimal(d("1.5")), "1 1/2");
        assert_eq!(format_decimal(Decimal::ZERO), "0");
        assert_eq!(format_decimal(d("2")), "2");
        assert_eq!(format_decimal(d("2.0")), "2");
        assert_eq!(format_decimal(Decimal::TWO / Decimal::from(3)), "2/3");
        assert_eq!(format_decimal(d("0.7")), "7/10");
        assert_eq!(format_decimal(d("-0.5")), "-1/2");
    }

    #[test]
    fn near_integers_round_up_to_the_next_whole() {
        let third = Decimal::ONE / Decimal::from(3);
        assert_eq!(format_decimal(third * Decimal::from(3)), "1");
    }

    #[test]
    fn finds_first_url() {
        assert_eq!(
            extract_first_url("Pay me at https://bank.example/pay?id=42 thanks"),
            Some("https://bank.example/pay?id=42")
        );
        assert_eq!(extract_first_url("NL00 BANK 0123 4567 89"), None);
    }
}
