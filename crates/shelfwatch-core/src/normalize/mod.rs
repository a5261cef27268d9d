//! Provider-agnostic attribute normalization.
//!
//! Every extractor is total: malformed input logs and yields
//! [`Field::NotFound`] for that attribute only, so one bad field never
//! aborts a record.

mod coupon;
mod number;
mod price;
mod rank;
mod rating;
mod reviews;

use chrono::{DateTime, Utc};

pub use coupon::extract_coupon;
pub use price::{discount_percent, extract_price, final_price, prime_price_from_message};
pub use rank::extract_rank;
pub use rating::extract_rating;
pub use reviews::extract_review_count;

use crate::domain::{Field, ListingCode, MarketHint, ProductRecord, RawAttributePayload, RawListing};

/// Builds canonical [`ProductRecord`]s from raw provider listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeNormalizer;

impl AttributeNormalizer {
    pub const fn new() -> Self {
        Self
    }

    pub fn normalize(
        &self,
        listing_id: ListingCode,
        source_url: &str,
        market: &MarketHint,
        raw: &RawListing,
        scraped_at: DateTime<Utc>,
    ) -> ProductRecord {
        let currency = market.currency;
        tracing::debug!(
            listing = %listing_id,
            host = %market.host,
            currency = currency.code(),
            "normalizing listing"
        );

        let full_price = extract_price(raw.price.as_ref(), currency);
        let prime_price = extract_price(raw.prime_price.as_ref(), currency)
            .or_else(|| prime_price_from_message(raw.prime_message.as_ref(), currency));
        let list_price = extract_price(raw.list_price.as_ref(), currency);
        let coupon_percent = extract_coupon(raw.coupon.as_ref());
        let final_price = final_price(&full_price, &prime_price, &coupon_percent);
        let discount_percent = discount_percent(&full_price, &final_price);

        let record = ProductRecord {
            listing_id,
            title: clean_text(raw.title.as_ref()),
            full_price,
            prime_price,
            list_price,
            coupon_percent,
            final_price,
            discount_percent,
            rating: extract_rating(raw.rating.as_ref(), raw.rating_text.as_ref()),
            review_count: extract_review_count(raw.review_count.as_ref()),
            best_seller_rank: extract_rank(raw.best_seller_rank.as_ref()),
            brand: clean_text(raw.brand.as_ref()).and_then(clean_brand),
            scrape_timestamp: scraped_at,
            source_url: source_url.to_owned(),
        };

        tracing::info!(
            listing = %record.listing_id,
            price = ?record.full_price.as_ref().found().map(ToString::to_string),
            rating = ?record.rating.as_ref().found(),
            "listing normalized"
        );
        record
    }
}

/// Collapses runs of whitespace; blank text is not found.
fn clean_text(payload: Option<&RawAttributePayload>) -> Field<String> {
    let text = match payload {
        Some(RawAttributePayload::Text(text)) => text.clone(),
        Some(RawAttributePayload::Number(value)) => value.to_string(),
        Some(RawAttributePayload::Structured(value)) => match value.get("name") {
            Some(serde_json::Value::String(name)) => name.clone(),
            _ => return Field::NotFound,
        },
        None => return Field::NotFound,
    };
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        Field::NotFound
    } else {
        Field::Found(collapsed)
    }
}

/// Strips storefront wording such as `Besuche den Acme-Store` or `Brand: Acme`.
fn clean_brand(brand: String) -> Field<String> {
    let mut name = brand.as_str();
    for prefix in ["Visit the ", "Besuche den ", "Brand: ", "Marke: "] {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
        }
    }
    for suffix in ["-Store", " Store"] {
        if let Some(rest) = name.strip_suffix(suffix) {
            name = rest;
        }
    }
    let name = name.trim();
    if name.is_empty() {
        Field::NotFound
    } else {
        Field::Found(name.to_owned())
    }
}
