//! Currency and number helpers for the input and display boundaries.
//!
//! Parsing is total: malformed input maps to zero instead of an error.
//! Formatting is fixed to Brazilian Portuguese with BRL and is never the
//! source of truth; formatted strings are not persisted.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Separators and currency symbol of a display locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub decimal_separator: char,
    pub thousands_separator: char,
    pub currency_symbol: &'static str,
}

/// Brazilian Portuguese with the Brazilian real.
pub const PT_BR: NumberLocale = NumberLocale {
    decimal_separator: ',',
    thousands_separator: '.',
    currency_symbol: "R$",
};

/// Maximum fraction digits of a plain number display.
const NUMBER_MAX_FRACTION_DIGITS: u32 = 3;

/// Largest magnitude a parsed input may take.
///
/// Kept an order of magnitude under `Decimal::MAX` so the value's `f64`
/// form in a snapshot still reads back as a `Decimal`.
pub fn input_ceiling() -> Decimal {
    Decimal::MAX / Decimal::TEN
}

fn clamp_input(value: Decimal) -> Decimal {
    let ceiling = input_ceiling();
    value.clamp(-ceiling, ceiling)
}

/// Parse text typed into a currency input.
///
/// Every non-digit is dropped and the remaining digits are read as cents, so
/// the last two digits typed are always the minor unit: `"150"` is 1.50 and
/// `"R$ 1.234,56"` is 1234.56. Input without digits is zero. Amounts above
/// [`input_ceiling`] saturate to it.
pub fn parse_currency_text(text: &str) -> Decimal {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Decimal::ZERO;
    }
    digits
        .parse::<i128>()
        .ok()
        .and_then(|cents| Decimal::try_from_i128_with_scale(cents, 2).ok())
        .map(clamp_input)
        .unwrap_or_else(input_ceiling)
}

/// Parse text typed into the percentage input.
///
/// Reads the longest numeric prefix (optional sign, digits, one `.`, optional
/// exponent) after leading whitespace, like a lenient float parse. Anything
/// without a numeric prefix is zero; magnitudes above [`input_ceiling`]
/// saturate to it.
pub fn parse_percentage_text(text: &str) -> Decimal {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        mantissa_digits += j - frac_start;
        end = j;
    }
    if mantissa_digits == 0 {
        return Decimal::ZERO;
    }
    let mut has_exponent = false;
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut j = end + 1;
        if matches!(bytes.get(j), Some(b'+') | Some(b'-')) {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
            has_exponent = true;
        }
    }
    let candidate = normalize_float_literal(&s[..end]);
    let parsed = if has_exponent {
        Decimal::from_scientific(&candidate).ok()
    } else {
        Decimal::from_str(&candidate).ok()
    };
    parsed
        .or_else(|| candidate.parse::<f64>().ok().and_then(Decimal::from_f64))
        .map(clamp_input)
        .unwrap_or_else(|| match candidate.parse::<f64>() {
            Ok(v) if v.is_finite() && v.abs() >= 1.0 => clamp_input(if v > 0.0 {
                Decimal::MAX
            } else {
                Decimal::MIN
            }),
            _ => Decimal::ZERO,
        })
}

/// Rewrite `+.5`, `-5.` style literals into forms `Decimal` accepts.
fn normalize_float_literal(lit: &str) -> String {
    let (sign, rest) = match lit.as_bytes().first() {
        Some(b'-') => ("-", &lit[1..]),
        Some(b'+') => ("", &lit[1..]),
        _ => ("", lit),
    };
    let (mantissa, exponent) = match rest.find(['e', 'E']) {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    let mut mantissa = mantissa.to_string();
    if mantissa.starts_with('.') {
        mantissa.insert(0, '0');
    }
    if mantissa.ends_with('.') {
        mantissa.pop();
    }
    format!("{sign}{mantissa}{exponent}")
}

/// Format a canonical amount as BRL, e.g. `R$ 1.234,56` (with a no-break space).
pub fn format_currency_display(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let abs = rounded.abs();
    let int_part = abs.trunc();
    let cents = ((abs - int_part) * Decimal::ONE_HUNDRED)
        .round()
        .to_u32()
        .unwrap_or(0);
    format!(
        "{sign}{}\u{a0}{}{}{:02}",
        PT_BR.currency_symbol,
        group_thousands(&int_part.normalize().to_string(), PT_BR.thousands_separator),
        PT_BR.decimal_separator,
        cents
    )
}

/// Format a plain number the pt-BR way: `1.234,5`, at most three fraction digits.
pub fn format_number_display(number: Decimal) -> String {
    let rounded = number
        .round_dp_with_strategy(NUMBER_MAX_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits.as_str(), None),
    };
    let mut out = format!(
        "{sign}{}",
        group_thousands(int_part, PT_BR.thousands_separator)
    );
    if let Some(frac) = frac_part {
        out.push(PT_BR.decimal_separator);
        out.push_str(frac);
    }
    out
}

/// Format a percentage rate, e.g. `2,5%`.
pub fn format_percentage_display(rate: Decimal) -> String {
    format!("{}%", format_number_display(rate))
}

fn group_thousands(int_digits: &str, sep: char) -> String {
    let len = int_digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}
