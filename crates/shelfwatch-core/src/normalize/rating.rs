use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::domain::{Field, RawAttributePayload};

/// Keys of an embedded ratings object, tried in order.
const RATING_KEYS: [&str; 6] = [
    "aggregateRating",
    "ratingValue",
    "rating",
    "average_rating",
    "ratings",
    "value",
];

static SCORE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:von|out of|sur|su|de|van|/|%|stars?|sterne)")
        .expect("rating marker regex is valid")
});

static FIRST_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("decimal regex is valid"));

/// Star rating on a 0-5 scale. The structured payload is consulted before
/// the rendered text; values outside the scale are discarded.
pub fn extract_rating(
    structured: Option<&RawAttributePayload>,
    rendered: Option<&RawAttributePayload>,
) -> Field<f64> {
    let rating = from_payload(structured).or_else(|| from_payload(rendered));
    if !rating.is_found() && (structured.is_some() || rendered.is_some()) {
        tracing::warn!(?structured, ?rendered, "rating not found");
    }
    rating
}

fn from_payload(payload: Option<&RawAttributePayload>) -> Field<f64> {
    match payload {
        None => Field::NotFound,
        Some(RawAttributePayload::Number(value)) => in_scale(*value),
        Some(RawAttributePayload::Text(text)) => from_text(text),
        Some(RawAttributePayload::Structured(value)) => from_value(value),
    }
}

fn from_value(value: &Value) -> Field<f64> {
    match value {
        Value::Number(number) => number.as_f64().map_or(Field::NotFound, in_scale),
        Value::String(text) => from_text(text),
        Value::Object(map) => RATING_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .map(from_value)
            .find(Field::is_found)
            .unwrap_or(Field::NotFound),
        _ => Field::NotFound,
    }
}

fn from_text(text: &str) -> Field<f64> {
    let normalized = text.replace(',', ".");
    let value = SCORE_MARKER
        .captures(&normalized)
        .and_then(|captures| captures.get(1))
        .or_else(|| FIRST_DECIMAL.find(&normalized))
        .and_then(|m| m.as_str().parse::<f64>().ok());
    value.map_or(Field::NotFound, in_scale)
}

fn in_scale(value: f64) -> Field<f64> {
    if value.is_finite() && (0.0..=5.0).contains(&value) {
        Field::Found(value)
    } else {
        tracing::debug!(value, "rating outside 0-5 scale");
        Field::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_rating_wins_over_text() {
        let structured = RawAttributePayload::Structured(json!({"aggregateRating": {"ratingValue": "4.6"}}));
        let text = RawAttributePayload::Text(String::from("3,9 von 5 Sternen"));
        assert_eq!(extract_rating(Some(&structured), Some(&text)), Field::Found(4.6));
    }

    #[test]
    fn german_text_with_comma_decimal() {
        let text = RawAttributePayload::Text(String::from("4,3 von 5 Sternen"));
        assert_eq!(extract_rating(None, Some(&text)), Field::Found(4.3));
    }

    #[test]
    fn marker_number_beats_leading_count() {
        let text = RawAttributePayload::Text(String::from("1234 ratings, 4.5 out of 5"));
        assert_eq!(extract_rating(None, Some(&text)), Field::Found(4.5));
    }

    #[test]
    fn out_of_scale_is_not_found() {
        assert_eq!(
            extract_rating(Some(&RawAttributePayload::Number(7.0)), None),
            Field::NotFound
        );
        assert_eq!(extract_rating(None, None), Field::NotFound);
    }
}
