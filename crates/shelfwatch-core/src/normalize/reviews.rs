use serde_json::Value;

use super::number::parse_count;
use crate::domain::{Field, RawAttributePayload};

const REVIEW_KEYS: [&str; 5] = [
    "reviews_count",
    "rating_count",
    "ratings_total",
    "review_count",
    "total_reviews",
];

/// Review count. `Found(0)` is a real zero and stays distinct from `NotFound`.
pub fn extract_review_count(payload: Option<&RawAttributePayload>) -> Field<u64> {
    match payload {
        None => Field::NotFound,
        Some(RawAttributePayload::Number(value)) => from_number(*value),
        Some(RawAttributePayload::Text(text)) => parse_count(text).into(),
        Some(RawAttributePayload::Structured(value)) => from_value(value),
    }
}

fn from_number(value: f64) -> Field<u64> {
    if value.is_finite() && value >= 0.0 {
        Field::Found(value as u64)
    } else {
        Field::NotFound
    }
}

fn from_value(value: &Value) -> Field<u64> {
    match value {
        Value::Number(number) => number.as_f64().map_or(Field::NotFound, from_number),
        Value::String(text) => parse_count(text).into(),
        Value::Object(map) => REVIEW_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .map(from_value)
            .find(Field::is_found)
            .unwrap_or(Field::NotFound),
        _ => Field::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_keeps_digits_only() {
        let text = RawAttributePayload::Text(String::from("1.234 Sternebewertungen"));
        assert_eq!(extract_review_count(Some(&text)), Field::Found(1234));
    }

    #[test]
    fn zero_is_found() {
        let zero = RawAttributePayload::Number(0.0);
        assert_eq!(extract_review_count(Some(&zero)), Field::Found(0));
    }

    #[test]
    fn structured_aliases() {
        let payload = RawAttributePayload::Structured(json!({"ratings_total": "2,045"}));
        assert_eq!(extract_review_count(Some(&payload)), Field::Found(2045));
        let missing = RawAttributePayload::Text(String::from("keine Bewertungen"));
        assert_eq!(extract_review_count(Some(&missing)), Field::NotFound);
    }
}
