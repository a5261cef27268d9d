use regex::Regex;
use serde_json::Value;

use super::number::{parse_decimal, AMOUNT};
use crate::domain::{Currency, Field, Money, Percent, RawAttributePayload};

/// Keys tried, in order, when a price arrives as an object.
const PRICE_KEYS: [&str; 6] = [
    "raw",
    "display_price",
    "value",
    "price",
    "actual_price",
    "current_price",
];

/// Extracts a price in `currency` from any payload shape.
pub fn extract_price(payload: Option<&RawAttributePayload>, currency: Currency) -> Field<Money> {
    let Some(payload) = payload else {
        return Field::NotFound;
    };
    tracing::debug!(?payload, currency = currency.code(), "extracting price");

    let price = match payload {
        RawAttributePayload::Number(amount) => money_from_number(*amount, currency),
        RawAttributePayload::Text(text) => price_from_text(text, currency),
        RawAttributePayload::Structured(value) => price_from_value(value, currency),
    };

    if !price.is_found() {
        tracing::warn!(?payload, "price not found in payload");
    }
    price
}

fn money_from_number(amount: f64, currency: Currency) -> Field<Money> {
    if amount.is_finite() && amount >= 0.0 {
        Field::Found(Money::new(amount, currency))
    } else {
        Field::NotFound
    }
}

fn price_from_value(value: &Value, currency: Currency) -> Field<Money> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .map_or(Field::NotFound, |amount| money_from_number(amount, currency)),
        Value::String(text) => price_from_text(text, currency),
        Value::Object(map) => {
            for key in PRICE_KEYS {
                if let Some(candidate) = map.get(key) {
                    tracing::debug!(key, ?candidate, "price key present");
                    let price = price_from_value(candidate, currency);
                    if price.is_found() {
                        return price;
                    }
                }
            }
            Field::NotFound
        }
        Value::Array(items) => items
            .iter()
            .map(|item| price_from_value(item, currency))
            .find(Field::is_found)
            .unwrap_or(Field::NotFound),
        Value::Null | Value::Bool(_) => Field::NotFound,
    }
}

/// Finds an amount adjacent to the currency symbol. Symbol-after-number
/// matches are preferred; within a pattern the last match wins.
pub(crate) fn price_from_text(text: &str, currency: Currency) -> Field<Money> {
    let symbol = regex::escape(currency.symbol());
    let patterns = [
        format!(r"({AMOUNT})\s?{symbol}"),
        format!(r"{symbol}\s?({AMOUNT})"),
    ];

    for pattern in &patterns {
        let Ok(regex) = Regex::new(pattern) else {
            continue;
        };
        let last = regex
            .captures_iter(text)
            .filter_map(|captures| captures.get(1))
            .last();
        if let Some(amount) = last.and_then(|m| parse_decimal(m.as_str())) {
            return Field::Found(Money::new(amount, currency));
        }
    }

    tracing::warn!(text, "could not extract price from text");
    Field::NotFound
}

/// Member price from a prime-exclusive banner such as
/// `Prime-Mitglieder kaufen diesen Artikel bei 43,19 €`.
pub fn prime_price_from_message(
    payload: Option<&RawAttributePayload>,
    currency: Currency,
) -> Field<Money> {
    let Some(RawAttributePayload::Text(message)) = payload else {
        return Field::NotFound;
    };
    // Banners sometimes carry trailing inline script.
    let message = message.split("(function").next().unwrap_or_default();
    let pattern = format!(
        r"(?i)kauf(?:e|en)?(?: diesen artikel)? (?:bei|für) ({AMOUNT})\s*{}",
        regex::escape(currency.symbol())
    );
    let Ok(regex) = Regex::new(&pattern) else {
        return Field::NotFound;
    };
    regex
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|m| parse_decimal(m.as_str()))
        .map(|amount| Money::new(amount, currency))
        .into()
}

/// `base − base × coupon / 100`, where base is the prime price when present
/// and non-zero, else the full price. No base price yields `NotFound`; a
/// missing coupon counts as 0%.
pub fn final_price(
    full_price: &Field<Money>,
    prime_price: &Field<Money>,
    coupon: &Field<Percent>,
) -> Field<Money> {
    let positive = |price: &Field<Money>| match price {
        Field::Found(money) if money.amount > 0.0 => Some(*money),
        _ => None,
    };

    let Some(base) = positive(prime_price).or_else(|| positive(full_price)) else {
        tracing::warn!("no base price available for final price");
        return Field::NotFound;
    };

    let coupon_value = match coupon {
        Field::Found(percent) => percent.value(),
        Field::NotFound => 0.0,
    };
    let discount = base.amount * coupon_value / 100.0;
    Field::Found(Money::new(base.amount - discount, base.currency))
}

/// `(full − final) / full × 100`; `NotFound` when either side is missing or
/// the full price is zero.
pub fn discount_percent(full_price: &Field<Money>, final_price: &Field<Money>) -> Field<Percent> {
    match (full_price, final_price) {
        (Field::Found(full), Field::Found(final_)) if full.amount != 0.0 => {
            Field::Found(Percent((full.amount - final_.amount) / full.amount * 100.0))
        }
        (Field::Found(_), Field::Found(_)) => {
            tracing::warn!("full price is zero, discount not applicable");
            Field::NotFound
        }
        _ => Field::NotFound,
    }
}
