//! Dimension string parsing
//!
//! Providers report physical dimensions in several loosely structured shapes.
//! The recognized pattern families, tried in this order of evidence:
//!
//! 1. Explicit length/width labels with quoted-inch markers (`45.67"L x 17.71"W x 1.18"H`)
//! 2. Explicit labels without unit markers (`Length: 116, Width: 45` - centimeters assumed)
//! 3. Three numbers followed by a unit word (`45.67 x 17.71 x 1.18 inches`)
//! 4. Three bare numbers (`116 x 45 x 3` - unit inferred from magnitude)
//! 5. Two numbers, with or without a unit word (`116 x 45 cm`)
//!
//! All results are normalized to centimeters and canonical orientation
//! (length >= width).

use crate::units::{round2, ParseError};

/// Length units observed in provider dimension strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthUnit {
    Inches,
    Centimeters,
    Millimeters,
    Meters,
}

impl LengthUnit {
    fn to_cm(self, value: f64) -> f64 {
        match self {
            Self::Inches => value * 2.54,
            Self::Centimeters => value,
            Self::Millimeters => value / 10.0,
            Self::Meters => value * 100.0,
        }
    }
}

/// Dimension axes that can be labeled in the input text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Length,
    Width,
    /// Height/depth/thickness; recognized so it can be excluded from
    /// length/width selection
    Height,
}

/// One number found in the text, with any unit or axis evidence around it
#[derive(Debug)]
struct Measure {
    value: f64,
    unit: Option<LengthUnit>,
    label: Option<Axis>,
}

/// Parses a free-text dimension string into `(length_cm, width_cm)`
///
/// Guarantees `length >= width` for every successful parse. Returns a
/// `ParseError` when no pattern family matches; never guesses a value.
pub fn parse_dimensions(text: &str) -> Result<(f64, f64), ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let measures = scan_measures(trimmed);
    if measures.len() < 2 {
        return Err(ParseError::no_match("dimension", text));
    }

    let unit = resolve_unit(&measures);

    // Labeled assignment wins when both axes are present
    let labeled_length = measures
        .iter()
        .find(|m| m.label == Some(Axis::Length))
        .map(|m| m.value);
    let labeled_width = measures
        .iter()
        .find(|m| m.label == Some(Axis::Width))
        .map(|m| m.value);

    let (raw_length, raw_width) = match (labeled_length, labeled_width) {
        (Some(l), Some(w)) => (l, w),
        _ => {
            // Unlabeled: the two largest positive values among the first
            // three non-height numbers are length and width
            let mut candidates: Vec<f64> = measures
                .iter()
                .filter(|m| m.label != Some(Axis::Height))
                .map(|m| m.value)
                .filter(|v| *v > 0.0)
                .take(3)
                .collect();
            if candidates.len() < 2 {
                return Err(ParseError::no_match("dimension", text));
            }
            candidates.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            (candidates[0], candidates[1])
        }
    };

    if raw_length <= 0.0 || raw_width <= 0.0 {
        return Err(ParseError::no_match("dimension", text));
    }

    let mut length = round2(unit.to_cm(raw_length));
    let mut width = round2(unit.to_cm(raw_width));

    // Canonical orientation: labels inverted against magnitude still yield
    // length >= width
    if width > length {
        std::mem::swap(&mut length, &mut width);
    }

    Ok((length, width))
}

/// Resolves the unit for the whole dimension set
///
/// Explicit markers win; labeled-but-unitless strings are centimeters by
/// provider convention; otherwise magnitude decides (panel-scale values
/// above 20 are centimeters, below are inches).
fn resolve_unit(measures: &[Measure]) -> LengthUnit {
    if let Some(unit) = measures.iter().find_map(|m| m.unit) {
        return unit;
    }
    if measures.iter().any(|m| m.label.is_some()) {
        return LengthUnit::Centimeters;
    }
    let larger = measures
        .iter()
        .take(2)
        .map(|m| m.value)
        .fold(0.0_f64, f64::max);
    if larger > 20.0 {
        LengthUnit::Centimeters
    } else {
        LengthUnit::Inches
    }
}

/// Splits the text into numbers and inspects the text around each one for
/// unit markers and axis labels
fn scan_measures(text: &str) -> Vec<Measure> {
    let spans = number_spans(text);
    if spans.is_empty() {
        return Vec::new();
    }

    // gaps[i] is the text before number i; gaps[n] is the trailing text
    let mut gaps: Vec<&str> = Vec::with_capacity(spans.len() + 1);
    gaps.push(&text[..spans[0].1]);
    for window in spans.windows(2) {
        gaps.push(&text[window[0].2..window[1].1]);
    }
    gaps.push(&text[spans[spans.len() - 1].2..]);

    let mut consumed = vec![false; gaps.len()];
    let mut measures = Vec::with_capacity(spans.len());

    for (i, (value, _, _)) in spans.iter().enumerate() {
        let (unit, suffix_label) = leading_tokens(gaps[i + 1]);
        if suffix_label.is_some() {
            consumed[i + 1] = true;
        }
        let label = suffix_label.or_else(|| {
            if consumed[i] {
                None
            } else {
                trailing_label(gaps[i])
            }
        });
        measures.push(Measure {
            value: *value,
            unit,
            label,
        });
    }

    measures
}

/// Finds every decimal number in the text as `(value, start, end)` byte spans
fn number_spans(text: &str) -> Vec<(f64, usize, usize)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            let mut seen_dot = false;
            while i < bytes.len()
                && (bytes[i].is_ascii_digit() || (bytes[i] == b'.' && !seen_dot))
            {
                if bytes[i] == b'.' {
                    // A trailing dot is sentence punctuation, not a decimal
                    if i + 1 >= bytes.len() || !bytes[i + 1].is_ascii_digit() {
                        break;
                    }
                    seen_dot = true;
                }
                i += 1;
            }
            if let Ok(value) = text[start..i].parse::<f64>() {
                spans.push((value, start, i));
            }
        } else {
            i += 1;
        }
    }
    spans
}

/// Inspects the text immediately after a number for a unit marker and an
/// axis label (`"L`, `cm`, `in W`, ...)
fn leading_tokens(gap: &str) -> (Option<LengthUnit>, Option<Axis>) {
    let mut rest = gap.trim_start();
    let mut unit = None;

    if let Some(stripped) = rest
        .strip_prefix('"')
        .or_else(|| rest.strip_prefix('\u{201d}'))
    {
        unit = Some(LengthUnit::Inches);
        rest = stripped;
    }

    let word: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let lower = word.to_lowercase();

    if let Some(axis) = classify_label(&lower) {
        return (unit, Some(axis));
    }
    if unit.is_none() {
        unit = classify_unit(&lower);
        if unit.is_some() {
            // A single-letter axis may follow the unit word ("45 cm L x ...")
            let after = rest[word.len()..].trim_start();
            let next: String = after
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect();
            if next.len() == 1 {
                if let Some(axis) = classify_label(&next.to_lowercase()) {
                    return (unit, Some(axis));
                }
            }
        }
    }

    (unit, None)
}

/// Extracts an axis label from the end of the text preceding a number
/// (`Length: 116` style)
fn trailing_label(gap: &str) -> Option<Axis> {
    let stripped = gap.trim_end_matches(|c: char| !c.is_ascii_alphabetic());
    let word: String = stripped
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    classify_label(&word.to_lowercase())
}

fn classify_unit(word: &str) -> Option<LengthUnit> {
    match word {
        "in" | "inch" | "inches" => Some(LengthUnit::Inches),
        "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => {
            Some(LengthUnit::Centimeters)
        }
        "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => {
            Some(LengthUnit::Millimeters)
        }
        "m" | "meter" | "meters" | "metre" | "metres" => Some(LengthUnit::Meters),
        _ => None,
    }
}

fn classify_label(word: &str) -> Option<Axis> {
    match word {
        "l" | "length" | "long" => Some(Axis::Length),
        "w" | "width" | "wide" => Some(Axis::Width),
        "h" | "height" | "high" | "d" | "depth" | "deep" | "t" | "thickness" | "thick" => {
            Some(Axis::Height)
        }
        _ => None,
    }
}
