//! Display helpers for currency and percentage values.
//!
//! The calculator hands out raw numbers; these turn them into the strings the
//! rendering layer shows.

use crate::metrics::Metric;

/// `7.8` → `"7.8%"` with the given number of decimals.
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value)
}

/// Parses `"7.8%"`, `"-8.2%"`, `"−16.4 %"` or a bare number.
pub fn parse_percent(input: &str) -> Option<f64> {
    let cleaned = input.trim().replace('\u{2212}', "-");
    let number = cleaned.strip_suffix('%').unwrap_or(&cleaned).trim();
    let value: f64 = number.parse().ok()?;
    value.is_finite().then_some(value)
}

/// `2_600_000.0` → `"$2.60M"`
pub fn format_millions(value: f64) -> String {
    with_sign(value, |v| format!("${:.2}M", v / 1_000_000.0))
}

/// `485_000.0` → `"$485K"`
pub fn format_thousands(value: f64) -> String {
    with_sign(value, |v| format!("${:.0}K", v / 1_000.0))
}

/// Undefined metrics render as `n/a`.
pub fn format_metric(metric: Metric, render: impl Fn(f64) -> String) -> String {
    match metric {
        Metric::Value(v) => render(v),
        Metric::Undefined => "n/a".to_string(),
    }
}

fn with_sign(value: f64, render: impl Fn(f64) -> String) -> String {
    if value < 0.0 {
        format!("-{}", render(-value))
    } else {
        render(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_roundtrip_display() {
        assert_eq!(format_percent(7.8, 1), "7.8%");
        assert_eq!(format_percent(-8.2, 1), "-8.2%");
        assert_eq!(format_percent(81.0, 0), "81%");
    }

    #[test]
    fn test_parse_percent_variants() {
        assert_eq!(parse_percent("7.8%"), Some(7.8));
        assert_eq!(parse_percent("-16.4%"), Some(-16.4));
        assert_eq!(parse_percent(" \u{2212}8.2 % "), Some(-8.2));
        assert_eq!(parse_percent("10.4"), Some(10.4));
        assert_eq!(parse_percent("n/a"), None);
        assert_eq!(parse_percent("inf%"), None);
    }

    #[test]
    fn test_currency_scaling() {
        assert_eq!(format_millions(2_600_000.0), "$2.60M");
        assert_eq!(format_millions(3_140_000.0), "$3.14M");
        assert_eq!(format_thousands(485_000.0), "$485K");
        assert_eq!(format_thousands(-70_000.0), "-$70K");
    }

    #[test]
    fn test_undefined_metric_renders_na() {
        assert_eq!(format_metric(Metric::Undefined, |v| format_percent(v, 1)), "n/a");
        assert_eq!(format_metric(Metric::Value(-2.1), |v| format_percent(v, 1)), "-2.1%");
    }
}
