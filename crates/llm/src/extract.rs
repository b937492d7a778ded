/// Finds the first signed decimal (`-?digits(.digits)?`) in a model reply.
///
/// Replies are not guaranteed to contain only a number, e.g. `"Score: 0.73"`.
pub fn extract_first_decimal(raw: &str) -> Option<f64> {
    let bytes = raw.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let start = if start > 0 && bytes[start - 1] == b'-' {
        start - 1
    } else {
        start
    };

    let mut end = skip_digits(bytes, start + 1);
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end = skip_digits(bytes, end + 1);
    }

    raw[start..end].parse::<f64>().ok()
}

/// Extracts and clamps a score, falling back to neutral when nothing parses.
pub fn extract_score(raw: &str) -> f64 {
    extract_first_decimal(raw).map_or(0.0, clamp_score)
}

/// Clamps into [-1, 1]; infinities saturate, NaN collapses to neutral.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

fn skip_digits(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && bytes[index].is_ascii_digit() {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_number_embedded_in_prose() {
        assert_eq!(extract_score("Score: 0.73 (positive)"), 0.73);
    }

    #[test]
    fn keeps_leading_minus_sign() {
        assert_eq!(extract_score("-0.4"), -0.4);
        assert_eq!(extract_score("sentiment = -1"), -1.0);
    }

    #[test]
    fn hyphen_not_followed_by_digit_is_not_a_sign() {
        assert_eq!(extract_first_decimal("so-so, 0.2"), Some(0.2));
    }

    #[test]
    fn trailing_dot_without_digits_is_ignored() {
        assert_eq!(extract_first_decimal("1. Great"), Some(1.0));
    }

    #[test]
    fn only_the_first_number_counts() {
        assert_eq!(extract_score("0.5 or maybe -0.9"), 0.5);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(extract_score("7"), 1.0);
        assert_eq!(extract_score("-3.5"), -1.0);
    }

    #[test]
    fn falls_back_to_neutral_without_digits() {
        assert_eq!(extract_score("I cannot rate that."), 0.0);
        assert_eq!(extract_score(""), 0.0);
    }

    #[test]
    fn nan_is_neutral() {
        assert_eq!(clamp_score(f64::NAN), 0.0);
    }

    #[test]
    fn infinities_saturate() {
        assert_eq!(clamp_score(f64::INFINITY), 1.0);
        assert_eq!(clamp_score(f64::NEG_INFINITY), -1.0);
    }

    #[test]
    fn overflowing_digit_runs_clamp_to_the_edges() {
        let digits = "9".repeat(400);
        assert_eq!(extract_score(&digits), 1.0);
        assert_eq!(extract_score(&format!("-{digits}")), -1.0);
    }
}
