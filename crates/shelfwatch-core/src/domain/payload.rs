use serde::Serialize;
use serde_json::Value;

/// Provider-specific attribute value before normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawAttributePayload {
    Number(f64),
    Text(String),
    /// A JSON object or array as returned by the provider.
    Structured(Value),
}

impl RawAttributePayload {
    /// Maps a JSON value; `null`, booleans and blank strings carry no attribute.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Bool(_) => None,
            Value::Number(number) => number.as_f64().map(Self::Number),
            Value::String(text) if text.trim().is_empty() => None,
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Array(items) if items.is_empty() => None,
            Value::Object(map) if map.is_empty() => None,
            Value::Array(_) | Value::Object(_) => Some(Self::Structured(value.clone())),
        }
    }

    pub fn text(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self::Text(value))
        }
    }
}

/// Raw attributes for one listing, as mapped by a provider adapter.
///
/// Every field is optional: an adapter that cannot locate an attribute
/// leaves it `None` and the normalizer records it as not found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawListing {
    pub title: Option<RawAttributePayload>,
    pub brand: Option<RawAttributePayload>,
    pub price: Option<RawAttributePayload>,
    pub list_price: Option<RawAttributePayload>,
    pub prime_price: Option<RawAttributePayload>,
    /// Prime-exclusive banner text carrying the member price.
    pub prime_message: Option<RawAttributePayload>,
    pub coupon: Option<RawAttributePayload>,
    pub rating: Option<RawAttributePayload>,
    /// Human-readable rating text, used when `rating` is absent or unusable.
    pub rating_text: Option<RawAttributePayload>,
    pub review_count: Option<RawAttributePayload>,
    pub best_seller_rank: Option<RawAttributePayload>,
}

impl RawListing {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
