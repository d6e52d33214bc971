//! Field-level cleaning for Census tables: ZCTA label extraction and
//! numeric coercion.

use once_cell::sync::Lazy;
use regex::Regex;

static ZCTA_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ZCTA5\s(\d+)").expect("valid ZCTA label regex"));

/// Top-coded value the ACS publishes for median household income.
pub const INCOME_TOP_CODE: &str = "250,000+";

/// Extracts the bare ZCTA code from a Census label such as `"ZCTA5 10001"`.
///
/// Returns `None` when the label does not carry a ZCTA5 code; such rows
/// never take part in a join.
pub fn extract_zcta(label: &str) -> Option<String> {
    ZCTA_LABEL_RE
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parses a plain signed integer or decimal. Anything else (Census
/// annotations like `"-"`, `"(X)"`, `"2,500-"`, blanks) is missing.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix(['-', '+']).unwrap_or(trimmed);

    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }

    trimmed.parse::<f64>().ok()
}

/// Like [`coerce_numeric`], but maps the income top-code to its floor first.
pub fn coerce_income(raw: &str) -> Option<f64> {
    if raw.trim() == INCOME_TOP_CODE {
        return Some(250_000.0);
    }
    coerce_numeric(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_zcta_from_census_label() {
        assert_eq!(extract_zcta("ZCTA5 10001"), Some("10001".to_string()));
        assert_eq!(extract_zcta("ZCTA5 00601"), Some("00601".to_string()));
    }

    #[test]
    fn test_extract_zcta_rejects_other_labels() {
        assert_eq!(extract_zcta("Geographic Area Name"), None);
        assert_eq!(extract_zcta("10001"), None);
        assert_eq!(extract_zcta("ZCTA5"), None);
        assert_eq!(extract_zcta(""), None);
    }

    #[test]
    fn test_coerce_numeric_plain_values() {
        assert_eq!(coerce_numeric("42"), Some(42.0));
        assert_eq!(coerce_numeric(" 1234.5 "), Some(1234.5));
        assert_eq!(coerce_numeric("-3"), Some(-3.0));
        assert_eq!(coerce_numeric("0"), Some(0.0));
    }

    #[test]
    fn test_coerce_numeric_annotations_are_missing() {
        for raw in ["-", "N", "(X)", "2,500-", "250,000+", "", "   ", ".", "NaN", "inf", "1e5"] {
            assert_eq!(coerce_numeric(raw), None, "{raw:?} should be missing");
        }
    }

    #[test]
    fn test_coerce_income_top_code() {
        assert_eq!(coerce_income("250,000+"), Some(250000.0));
        assert_eq!(coerce_income("87500"), Some(87500.0));
        assert_eq!(coerce_income("-"), None);
    }
}
