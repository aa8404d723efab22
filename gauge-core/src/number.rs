//! Real-number text rendering

/// Significant digits used when printing scale factors and origins
pub const DEFAULT_PRECISION: usize = 15;

/// Render `value` the way C's `%.{precision}g` does: shortest of fixed or
/// scientific notation, trailing zeros removed.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// `format_general` with [`DEFAULT_PRECISION`]
pub fn format_real(value: f64) -> String {
    format_general(value, DEFAULT_PRECISION)
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_notation() {
        assert_eq!(format_real(1000.0), "1000");
        assert_eq!(format_real(0.001), "0.001");
        assert_eq!(format_real(273.15), "273.15");
        assert_eq!(format_real(-2.5), "-2.5");
        assert_eq!(format_real(0.0), "0");
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(format_real(1e-6), "1e-06");
        assert_eq!(format_real(1.5e20), "1.5e+20");
        assert_eq!(format_general(123456.0, 3), "1.23e+05");
    }

    #[test]
    fn test_precision_rounding() {
        assert_eq!(format_real(0.1 + 0.2), "0.3");
        assert_eq!(format_general(2.0 / 3.0, 4), "0.6667");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_real(f64::NAN), "nan");
        assert_eq!(format_real(f64::NEG_INFINITY), "-inf");
    }
}
