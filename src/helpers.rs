//! Shared numeric helpers for query coordinates and displayed readings.
//!
//! - `round_to`: fixed decimal places (query coordinates, 4dp for yr.no, 5dp for maps)
//! - `round_1dp`: weather values shown in the table (temperature, wind, etc.)
//!
//! Both return `None` for non-finite inputs (NaN, ±Inf).

/// Round to a fixed number of decimal places.
pub(crate) fn round_to(v: f64, places: u32) -> Option<f64> {
    if !v.is_finite() {
        tracing::warn!("round_to received non-finite value {}", v);
        return None;
    }
    let factor = 10f64.powi(places as i32);
    Some((v * factor).round() / factor)
}

/// Round a weather reading to 1 decimal place.
///
/// 0.1°C / 0.1 m/s / 0.1 mm precision is what yr.no reports; anything finer
/// is float noise from unit conversions.
pub(crate) fn round_1dp(v: f64) -> Option<f64> {
    round_to(v, 1)
}

/// Format an optional reading with a unit, `unknown` when absent.
pub(crate) fn format_reading(v: Option<f64>, unit: &str) -> String {
    match v.and_then(round_1dp) {
        Some(value) => format!("{:.1}{}", value, unit),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_four_places() {
        assert_eq!(round_to(63.446_827_1, 4), Some(63.4468));
        assert_eq!(round_to(10.421_906, 4), Some(10.4219));
    }

    #[test]
    fn test_round_1dp_rounds() {
        assert_eq!(round_1dp(3.16), Some(3.2));
        assert_eq!(round_1dp(-4.74), Some(-4.7));
    }

    #[test]
    fn test_round_nan() {
        assert_eq!(round_1dp(f64::NAN), None);
    }

    #[test]
    fn test_round_infinity() {
        assert_eq!(round_to(f64::INFINITY, 4), None);
        assert_eq!(round_to(f64::NEG_INFINITY, 4), None);
    }

    #[test]
    fn test_format_reading() {
        assert_eq!(format_reading(Some(-0.46), "°C"), "-0.5°C");
        assert_eq!(format_reading(Some(0.0), " mm"), "0.0 mm");
        assert_eq!(format_reading(None, "°C"), "unknown");
    }
}
