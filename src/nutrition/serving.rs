use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Serving size used when a description can't be parsed.
pub const DEFAULT_SERVING_AMOUNT: f64 = 100.0;

const ML_PER_FL_OZ: f64 = 29.5735;
const G_PER_LB: f64 = 453.592;
const ML_PER_CUP: f64 = 240.0;
const ML_PER_TBSP: f64 = 15.0;
const ML_PER_TSP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServingUnit {
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "ml")]
    Millilitres,
    #[serde(rename = "oz")]
    Ounces,
    #[serde(rename = "cup")]
    Cups,
}

impl ServingUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            ServingUnit::Grams => "g",
            ServingUnit::Millilitres => "ml",
            ServingUnit::Ounces => "oz",
            ServingUnit::Cups => "cup",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "g" => Some(ServingUnit::Grams),
            "ml" => Some(ServingUnit::Millilitres),
            "oz" => Some(ServingUnit::Ounces),
            "cup" => Some(ServingUnit::Cups),
            _ => None,
        }
    }
}

impl fmt::Display for ServingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref SERVING_RE: Regex = Regex::new(
        r"(?i)(?:^|[^\d/.,])(\d+(?:[.,]\d+)?)\s*(fl\.?\s*oz|kg|mg|ml|lbs|lb|cups|cup|tbsp|tsp|oz|g|l)\b"
    )
    .unwrap();
}

/// Extracts `(amount, unit)` from text like `"1 cup (240ml)"` and converts it
/// to grams or millilitres. Comma decimals are accepted. A number directly
/// after a digit, `/`, `.` or `,` is never a quantity start, so fractions
/// like `1/2` are skipped.
pub fn parse_serving_descriptor(text: &str) -> Option<(f64, ServingUnit)> {
    let caps = SERVING_RE.captures(text)?;
    let value: f64 = caps[1].replace(',', ".").parse().ok()?;
    if !(value.is_finite() && value > 0.0) {
        return None;
    }

    let unit = caps[2].to_lowercase();
    let unit: String = unit.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    let canonical = match unit.as_str() {
        "g" => (value, ServingUnit::Grams),
        "kg" => (value * 1000.0, ServingUnit::Grams),
        "mg" => (value / 1000.0, ServingUnit::Grams),
        "ml" => (value, ServingUnit::Millilitres),
        "l" => (value * 1000.0, ServingUnit::Millilitres),
        "oz" | "floz" => (value * ML_PER_FL_OZ, ServingUnit::Millilitres),
        "lb" | "lbs" => (value * G_PER_LB, ServingUnit::Grams),
        "cup" | "cups" => (value * ML_PER_CUP, ServingUnit::Millilitres),
        "tbsp" => (value * ML_PER_TBSP, ServingUnit::Millilitres),
        "tsp" => (value * ML_PER_TSP, ServingUnit::Millilitres),
        _ => return None,
    };
    Some(canonical)
}

/// Unit guessed from loose substrings, used when the grammar doesn't match.
pub fn infer_fallback_unit(text: &str) -> ServingUnit {
    let lower = text.to_lowercase();
    if lower.contains("ml") || lower.contains('l') {
        ServingUnit::Millilitres
    } else if lower.contains("oz") {
        ServingUnit::Ounces
    } else if lower.contains("cup") {
        ServingUnit::Cups
    } else {
        ServingUnit::Grams
    }
}

/// Parses a serving description, falling back to 100 of an inferred unit.
pub fn serving_with_fallback(text: &str) -> (f64, ServingUnit) {
    parse_serving_descriptor(text)
        .unwrap_or_else(|| (DEFAULT_SERVING_AMOUNT, infer_fallback_unit(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn cup_rule_applies_before_parenthesised_ml() {
        let (amount, unit) = parse_serving_descriptor("1 cup (240ml)").unwrap();
        assert!(approx(amount, 240.0));
        assert_eq!(unit, ServingUnit::Millilitres);
    }

    #[test]
    fn grams_pass_through() {
        assert_eq!(parse_serving_descriptor("30 g"), Some((30.0, ServingUnit::Grams)));
        assert_eq!(parse_serving_descriptor("100g"), Some((100.0, ServingUnit::Grams)));
    }

    #[test]
    fn pounds_convert_to_grams() {
        let (amount, unit) = parse_serving_descriptor("1.5 lb").unwrap();
        assert!(approx(amount, 680.388));
        assert_eq!(unit, ServingUnit::Grams);
        let (amount, _) = parse_serving_descriptor("2 lbs").unwrap();
        assert!(approx(amount, 907.184));
    }

    #[test]
    fn ounces_convert_to_millilitres() {
        let (amount, unit) = parse_serving_descriptor("2 oz").unwrap();
        assert!(approx(amount, 59.147));
        assert_eq!(unit, ServingUnit::Millilitres);
        let (amount, _) = parse_serving_descriptor("12 fl oz").unwrap();
        assert!(approx(amount, 354.882));
    }

    #[test]
    fn metric_prefixes_and_spoons() {
        assert_eq!(parse_serving_descriptor("1 kg"), Some((1000.0, ServingUnit::Grams)));
        assert_eq!(parse_serving_descriptor("500 mg"), Some((0.5, ServingUnit::Grams)));
        assert_eq!(parse_serving_descriptor("1 L"), Some((1000.0, ServingUnit::Millilitres)));
        assert_eq!(parse_serving_descriptor("2 tbsp"), Some((30.0, ServingUnit::Millilitres)));
        assert_eq!(parse_serving_descriptor("3 tsp"), Some((15.0, ServingUnit::Millilitres)));
    }

    #[test]
    fn comma_decimal_separator_is_accepted() {
        assert_eq!(parse_serving_descriptor("0,5 l"), Some((500.0, ServingUnit::Millilitres)));
        assert_eq!(parse_serving_descriptor("12,5 g"), Some((12.5, ServingUnit::Grams)));
    }

    #[test]
    fn rejects_missing_unit_or_non_positive_amount() {
        assert_eq!(parse_serving_descriptor("1 slice"), None);
        assert_eq!(parse_serving_descriptor("large egg"), None);
        assert_eq!(parse_serving_descriptor("0 g"), None);
        assert_eq!(parse_serving_descriptor(""), None);
    }

    #[test]
    fn unit_must_end_at_word_boundary() {
        // "1 large egg (50 g)" must not read "1 l"
        assert_eq!(
            parse_serving_descriptor("1 large egg (50 g)"),
            Some((50.0, ServingUnit::Grams))
        );
    }

    #[test]
    fn fraction_is_not_read_as_its_denominator() {
        assert_eq!(
            parse_serving_descriptor("1/2 cup (120ml)"),
            Some((120.0, ServingUnit::Millilitres))
        );
        assert_eq!(parse_serving_descriptor("3/4 cup"), None);
        assert_eq!(parse_serving_descriptor("serving: 45g"), Some((45.0, ServingUnit::Grams)));
    }

    #[test]
    fn fallback_infers_unit_from_substrings() {
        assert_eq!(serving_with_fallback("a bottle"), (100.0, ServingUnit::Millilitres));
        assert_eq!(serving_with_fallback("oz"), (100.0, ServingUnit::Ounces));
        assert_eq!(serving_with_fallback("1 cup"), (240.0, ServingUnit::Millilitres));
        assert_eq!(serving_with_fallback("cup"), (100.0, ServingUnit::Cups));
        assert_eq!(serving_with_fallback("piece"), (100.0, ServingUnit::Grams));
    }
}
