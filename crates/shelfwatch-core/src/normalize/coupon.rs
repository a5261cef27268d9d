use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::number::parse_decimal;
use crate::domain::{Field, Percent, RawAttributePayload};

static KEYWORD_PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d{1,2})?)\s*(?:%|prozent|percent|pour cent|por ciento|per cento)")
        .expect("coupon keyword regex is valid")
});

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d{1,2})?").expect("number regex is valid"));

/// Coupon percentage. Numbers are already percentages; text prefers an
/// amount tagged with a percent keyword, then the first number present.
pub fn extract_coupon(payload: Option<&RawAttributePayload>) -> Field<Percent> {
    let coupon = match payload {
        None => return Field::NotFound,
        Some(RawAttributePayload::Number(value)) => percent(*value),
        Some(RawAttributePayload::Text(text)) => coupon_from_text(text),
        Some(RawAttributePayload::Structured(value)) => coupon_from_value(value),
    };
    tracing::debug!(?payload, ?coupon, "coupon extracted");
    coupon
}

fn percent(value: f64) -> Field<Percent> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Field::Found(Percent(value))
    } else {
        tracing::warn!(value, "coupon outside 0-100 ignored");
        Field::NotFound
    }
}

fn coupon_from_text(text: &str) -> Field<Percent> {
    let amount = KEYWORD_PERCENT
        .captures(text)
        .and_then(|captures| captures.get(1))
        .or_else(|| FIRST_NUMBER.find(text))
        .and_then(|m| parse_decimal(m.as_str()));

    match amount {
        Some(value) => percent(value),
        None => Field::NotFound,
    }
}

fn coupon_from_value(value: &Value) -> Field<Percent> {
    match value {
        Value::Number(number) => number.as_f64().map_or(Field::NotFound, percent),
        Value::String(text) => coupon_from_text(text),
        Value::Object(map) => ["percent", "discount", "value", "text"]
            .iter()
            .filter_map(|key| map.get(*key))
            .map(coupon_from_value)
            .find(Field::is_found)
            .unwrap_or(Field::NotFound),
        _ => Field::NotFound,
    }
}
