//! Utility functions and helpers

/// Percentage change from `old_value` to `new_value`.
/// Returns `None` for a zero or non-finite base so callers never divide by zero.
pub fn percentage_change(old_value: f64, new_value: f64) -> Option<f64> {
    if old_value == 0.0 || !old_value.is_finite() {
        return None;
    }
    Some((new_value - old_value) / old_value * 100.0)
}

/// Format a USD price for chat messages
pub fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(100.0, 115.0), Some(15.0));
        assert_eq!(percentage_change(100.0, 80.0), Some(-20.0));
        assert_eq!(percentage_change(0.0, 80.0), None);
        assert_eq!(percentage_change(f64::NAN, 80.0), None);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(64123.456), "64123.46");
        assert_eq!(format_price(0.5), "0.50");
    }
}
