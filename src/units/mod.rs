//! Unit/Spec parser module
//!
//! Pure functions that turn free-text specification strings from provider
//! payloads into normalized numeric fields. No I/O, deterministic: the same
//! input always produces the same output or the same `ParseError`.
//!
//! # Components
//!
//! - `parse_dimensions`: length/width extraction with unit inference
//! - `parse_weight`, `parse_power`, `parse_voltage`, `parse_price`: scalar fields

mod dimensions;
mod measures;

use thiserror::Error;

// Re-export main functions
pub use dimensions::parse_dimensions;
pub use measures::{parse_power, parse_price, parse_voltage, parse_weight};

/// Errors produced by the specification parsers
///
/// Callers log the error and flag the record for review; a parse failure
/// never aborts a batch on its own.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("empty specification text")]
    Empty,

    #[error("no {kind} pattern found in '{text}'")]
    NoMatch { kind: &'static str, text: String },

    #[error("{kind} value {value} outside plausible range {min}..={max}")]
    OutOfRange {
        kind: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl ParseError {
    /// Builds a NoMatch error, truncating long inputs for log hygiene
    pub(crate) fn no_match(kind: &'static str, text: &str) -> Self {
        const MAX_CONTEXT: usize = 80;
        let text = if text.len() > MAX_CONTEXT {
            let cut = text
                .char_indices()
                .take_while(|(i, _)| *i < MAX_CONTEXT)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            format!("{}...", &text[..cut])
        } else {
            text.to_string()
        };
        Self::NoMatch { kind, text }
    }
}

/// Rounds to 2 decimal places, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(116.0018), 116.00);
        assert_eq!(round2(44.9834), 44.98);
        assert_eq!(round2(7.1985), 7.20);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_no_match_truncates_long_input() {
        let long = "x".repeat(200);
        let err = ParseError::no_match("dimension", &long);
        match err {
            ParseError::NoMatch { text, .. } => {
                assert!(text.len() < 100);
                assert!(text.ends_with("..."));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
