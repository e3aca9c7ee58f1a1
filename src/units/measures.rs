//! Scalar specification parsers: weight, power, voltage, price
//!
//! Each parser takes the first number in the text, interprets any unit word
//! that follows it, and normalizes to the catalog's canonical unit.

use crate::units::{round2, ParseError};

const LB_TO_KG: f64 = 0.453592;
const OZ_TO_KG: f64 = 0.0283495;

/// Plausible panel power range in watts; values outside are provider noise
const POWER_MIN_W: f64 = 0.0;
const POWER_MAX_W: f64 = 2000.0;

/// Parses a weight string into kilograms
///
/// Recognizes pounds, kilograms, grams, and ounces. Unit-less input is
/// treated as pounds, the provider's dominant convention.
pub fn parse_weight(text: &str) -> Result<f64, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let (value, rest) = first_number(trimmed, false)
        .ok_or_else(|| ParseError::no_match("weight", text))?;

    let kilograms = match unit_word(rest).as_str() {
        "kg" | "kilogram" | "kilograms" => value,
        "g" | "gram" | "grams" => value / 1000.0,
        "oz" | "ounce" | "ounces" => value * OZ_TO_KG,
        // "lb", "lbs", "pound", "pounds", or nothing
        _ => value * LB_TO_KG,
    };

    if kilograms <= 0.0 {
        return Err(ParseError::no_match("weight", text));
    }
    Ok(round2(kilograms))
}

/// Parses a power string into integer watts
///
/// Accepts scientific notation (`4.0e2 W`) and kilowatt suffixes. Values
/// outside the plausible panel range are rejected rather than stored.
pub fn parse_power(text: &str) -> Result<i64, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let (value, rest) = first_number(trimmed, true)
        .ok_or_else(|| ParseError::no_match("power", text))?;

    let word = unit_word(rest);
    let watts = if word.starts_with("kw") || word.starts_with("kilowatt") {
        value * 1000.0
    } else {
        value
    };

    if !(POWER_MIN_W..=POWER_MAX_W).contains(&watts) {
        return Err(ParseError::OutOfRange {
            kind: "power",
            value: watts,
            min: POWER_MIN_W,
            max: POWER_MAX_W,
        });
    }
    Ok(watts.round() as i64)
}

/// Parses a voltage string into decimal volts
pub fn parse_voltage(text: &str) -> Result<f64, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let (value, _) = first_number(trimmed, false)
        .ok_or_else(|| ParseError::no_match("voltage", text))?;
    Ok(round2(value))
}

/// Parses a price string into decimal USD
///
/// Strips currency symbols and thousands separators before numeric parsing.
pub fn parse_price(text: &str) -> Result<f64, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    let (value, _) = first_number(&cleaned, false)
        .ok_or_else(|| ParseError::no_match("price", text))?;
    Ok(round2(value))
}

/// Finds the first decimal number in the text and returns it with the
/// remainder of the string
///
/// With `scientific` set, an exponent suffix (`e2`, `E-1`) is consumed too.
fn first_number(text: &str, scientific: bool) -> Option<(f64, &str)> {
    let bytes = text.as_bytes();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            start = Some(i);
            break;
        }
    }
    let start = start?;

    let mut end = start;
    let mut seen_dot = false;
    while end < bytes.len() {
        let b = bytes[end];
        if b.is_ascii_digit() {
            end += 1;
        } else if b == b'.' && !seen_dot && end + 1 < bytes.len() && bytes[end + 1].is_ascii_digit()
        {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }

    if scientific && end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    text[start..end]
        .parse::<f64>()
        .ok()
        .map(|value| (value, &text[end..]))
}

/// Returns the lowercased alphabetic word immediately after a number
fn unit_word(rest: &str) -> String {
    rest.trim_start_matches(|c: char| c.is_whitespace() || c == '-')
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight_pounds() {
        assert_eq!(parse_weight("15.87 pounds").unwrap(), 7.20);
        assert_eq!(parse_weight("15.87 lbs").unwrap(), 7.20);
        assert_eq!(parse_weight("2 lb").unwrap(), 0.91);
    }

    #[test]
    fn test_parse_weight_metric() {
        assert_eq!(parse_weight("7.2 kg").unwrap(), 7.2);
        assert_eq!(parse_weight("500 grams").unwrap(), 0.5);
        assert_eq!(parse_weight("7200 g").unwrap(), 7.2);
    }

    #[test]
    fn test_parse_weight_ounces() {
        assert_eq!(parse_weight("16 oz").unwrap(), 0.45);
    }

    #[test]
    fn test_parse_weight_unitless_defaults_to_pounds() {
        assert_eq!(parse_weight("15.87").unwrap(), 7.20);
    }

    #[test]
    fn test_parse_weight_errors() {
        assert_eq!(parse_weight(""), Err(ParseError::Empty));
        assert!(matches!(
            parse_weight("heavy"),
            Err(ParseError::NoMatch { .. })
        ));
        assert!(matches!(
            parse_weight("0 kg"),
            Err(ParseError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_parse_power_watts() {
        assert_eq!(parse_power("400W").unwrap(), 400);
        assert_eq!(parse_power("400 watts").unwrap(), 400);
        assert_eq!(parse_power("399.6 W").unwrap(), 400);
    }

    #[test]
    fn test_parse_power_kilowatts() {
        assert_eq!(parse_power("0.4 kW").unwrap(), 400);
        assert_eq!(parse_power("1.2kw").unwrap(), 1200);
    }

    #[test]
    fn test_parse_power_scientific_notation() {
        assert_eq!(parse_power("4.0e2 W").unwrap(), 400);
        assert_eq!(parse_power("4E2").unwrap(), 400);
    }

    #[test]
    fn test_parse_power_out_of_range() {
        assert!(matches!(
            parse_power("9000 W"),
            Err(ParseError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_power("3 kW"),
            Err(ParseError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_parse_power_errors() {
        assert_eq!(parse_power("  "), Err(ParseError::Empty));
        assert!(matches!(
            parse_power("many watts"),
            Err(ParseError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_parse_voltage() {
        assert_eq!(parse_voltage("24V").unwrap(), 24.0);
        assert_eq!(parse_voltage("12.346 volts").unwrap(), 12.35);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$69.99").unwrap(), 69.99);
        assert_eq!(parse_price("$1,299.00").unwrap(), 1299.00);
        assert_eq!(parse_price("79.999").unwrap(), 80.0);
    }

    #[test]
    fn test_parse_price_errors() {
        assert_eq!(parse_price(""), Err(ParseError::Empty));
        assert!(matches!(
            parse_price("call for price"),
            Err(ParseError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_first_number_plain() {
        let (v, rest) = first_number("about 45.67 in", false).unwrap();
        assert_eq!(v, 45.67);
        assert_eq!(rest, " in");
    }

    #[test]
    fn test_first_number_scientific_only_when_enabled() {
        let (v, _) = first_number("4e2", true).unwrap();
        assert_eq!(v, 400.0);
        let (v, rest) = first_number("4e2", false).unwrap();
        assert_eq!(v, 4.0);
        assert_eq!(rest, "e2");
    }
}
