//! Common numeric helpers used throughout the engine

/// Round to two decimals, half-to-even (13.125 -> 13.12).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// `part / whole * 100`, or 0 when `whole` is zero.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    part / whole * 100.0
}

/// Clamp a percentage into `[0, 100]`.
pub fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_is_half_even() {
        assert_eq!(round2(13.125), 13.12);
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(-2.5), -2.5);
        assert_eq!(round2(33.333333), 33.33);
    }

    #[test]
    fn test_percentage_of_zero_whole() {
        assert_eq!(percentage(10.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, 4.0), 25.0);
    }

    #[test]
    fn test_clamp_pct() {
        assert_eq!(clamp_pct(-3.0), 0.0);
        assert_eq!(clamp_pct(140.0), 100.0);
        assert_eq!(clamp_pct(f64::NAN), 0.0);
    }
}
