//! Locale-tolerant decimal parsing shared by the extractors.

/// Regex fragment for an amount with optional thousands groups and an
/// optional one- or two-digit fraction, using `.` or `,` as separators.
pub(crate) const AMOUNT: &str = r"\d+(?:[.,]\d{3})*(?:[.,]\d{1,2})?";

/// Parses `23,45`, `1.299,00`, `1,299.00`, `29.99` and `1,299` alike.
///
/// The last separator is the decimal mark when one or two digits follow it;
/// every other separator is a thousands separator.
pub(crate) fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match cleaned.rfind(['.', ',']) {
        Some(index) => {
            let fraction_len = cleaned.len() - index - 1;
            let integer: String = cleaned[..index]
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            if (1..=2).contains(&fraction_len) {
                format!("{integer}.{}", &cleaned[index + 1..])
            } else {
                format!("{integer}{}", &cleaned[index + 1..])
            }
        }
        None => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses a whole count, dropping every non-digit (`1.234 Bewertungen`).
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_decimal_mark() {
        assert_eq!(parse_decimal("23,45"), Some(23.45));
        assert_eq!(parse_decimal("1.299,00"), Some(1299.0));
    }

    #[test]
    fn parses_dot_decimal_mark() {
        assert_eq!(parse_decimal("29.99"), Some(29.99));
        assert_eq!(parse_decimal("1,299.50"), Some(1299.5));
    }

    #[test]
    fn three_digit_group_is_thousands() {
        assert_eq!(parse_decimal("1,299"), Some(1299.0));
        assert_eq!(parse_decimal("2.366"), Some(2366.0));
    }

    #[test]
    fn rejects_text_without_digits() {
        assert_eq!(parse_decimal("n/a"), None);
        assert_eq!(parse_count("keine"), None);
        assert_eq!(parse_count("1.234 Bewertungen"), Some(1234));
    }
}
