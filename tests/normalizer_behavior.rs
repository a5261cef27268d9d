use chrono::{TimeZone, Utc};
use serde_json::json;
use shelfwatch_core::{
    AttributeNormalizer, CategoryRank, Currency, Field, ListingCode, MarketHint, Money, Percent,
    ProductRecord, RawAttributePayload, RawListing,
};

fn text(value: &str) -> Option<RawAttributePayload> {
    RawAttributePayload::text(value)
}

fn normalize(url: &str, raw: &RawListing) -> ProductRecord {
    let listing = ListingCode::from_url(url).expect("url carries a listing code");
    let market = MarketHint::from_url(url);
    let scraped_at = Utc
        .with_ymd_and_hms(2024, 5, 10, 11, 0, 0)
        .single()
        .expect("valid timestamp");
    AttributeNormalizer::new().normalize(listing, url, &market, raw, scraped_at)
}

fn amount(field: &Field<Money>) -> f64 {
    match field {
        Field::Found(money) => money.cents_rounded(),
        Field::NotFound => panic!("expected a price, got NotFound"),
    }
}

#[test]
fn german_listing_reads_comma_decimal_prices() {
    let raw = RawListing {
        title: text("  Wool Socks   5 Pairs "),
        price: text("23,45 €"),
        ..RawListing::default()
    };

    let record = normalize("https://www.amazon.de/dp/B0CXYZ1234", &raw);

    assert_eq!(record.listing_id.as_str(), "B0CXYZ1234");
    assert_eq!(record.full_price, Field::Found(Money::new(23.45, Currency::Eur)));
    assert_eq!(
        record.full_price.clone().found().map(|money| money.to_string()),
        Some(String::from("23.45 €"))
    );
}

#[test]
fn struck_through_price_text_keeps_the_current_price() {
    let raw = RawListing {
        price: text("29.99$ 19.99$"),
        ..RawListing::default()
    };

    let record = normalize("https://www.amazon.com/dp/B0CXYZ1234", &raw);

    assert_eq!(amount(&record.full_price), 19.99);
    assert_eq!(
        record.full_price.found().map(|money| money.to_string()),
        Some(String::from("19.99 $"))
    );
}

#[test]
fn best_seller_rank_keeps_every_category_in_order() {
    let raw = RawListing {
        best_seller_rank: text("Nr. 912 in Fashion (Siehe Top 100) Nr. 1 in Sportunterhemden"),
        ..RawListing::default()
    };

    let record = normalize("https://www.amazon.de/dp/B0CXYZ1234", &raw);
    let rank = record.best_seller_rank.clone().found().expect("rank found");

    assert_eq!(
        rank.entries,
        vec![
            CategoryRank {
                category: String::from("Fashion"),
                rank: 912,
            },
            CategoryRank {
                category: String::from("Sportunterhemden"),
                rank: 1,
            },
        ]
    );
    assert_eq!(record.headline_rank(), Field::Found(912));
    assert_eq!(rank.rank_in("Sportunterhemden"), Some(1));
}

#[test]
fn coupon_reduces_final_price_and_sets_discount() {
    let raw = RawListing {
        price: text("100,00 €"),
        coupon: text("Spare 10 % mit Coupon"),
        ..RawListing::default()
    };

    let record = normalize("https://www.amazon.de/dp/B0CXYZ1234", &raw);

    assert_eq!(record.coupon_percent, Field::Found(Percent(10.0)));
    assert_eq!(amount(&record.final_price), 90.0);
    match record.discount_percent {
        Field::Found(Percent(value)) => assert!((value - 10.0).abs() < 1e-9),
        Field::NotFound => panic!("discount should be computed"),
    }
}

#[test]
fn prime_banner_price_is_the_coupon_base() {
    let raw = RawListing {
        price: text("47,99 €"),
        prime_message: text("Prime-Mitglieder kaufen diesen Artikel bei 43,19 €"),
        coupon: Some(RawAttributePayload::Number(10.0)),
        ..RawListing::default()
    };

    let record = normalize("https://www.amazon.de/dp/B0CXYZ1234", &raw);

    assert_eq!(amount(&record.prime_price), 43.19);
    assert_eq!(amount(&record.final_price), 38.87);
}

#[test]
fn missing_attributes_are_explicitly_not_found() {
    let raw = RawListing {
        title: text("Wool Socks"),
        review_count: Some(RawAttributePayload::Number(0.0)),
        ..RawListing::default()
    };

    let record = normalize("https://www.amazon.de/dp/B0CXYZ1234", &raw);

    assert_eq!(record.full_price, Field::NotFound);
    assert_eq!(record.final_price, Field::NotFound);
    assert_eq!(record.discount_percent, Field::NotFound);
    assert_eq!(record.rating, Field::NotFound);
    assert_eq!(record.review_count, Field::Found(0));

    let rendered = serde_json::to_value(&record).expect("record serializes");
    assert_eq!(rendered["full_price"], serde_json::Value::Null);
    assert_eq!(rendered["review_count"], json!(0));
}

#[test]
fn structured_rating_and_review_payloads() {
    let raw = RawListing {
        rating: Some(RawAttributePayload::Structured(
            json!({"aggregateRating": {"ratingValue": "4.6"}}),
        )),
        rating_text: text("3,9 von 5 Sternen"),
        review_count: text("1.234 Sternebewertungen"),
        ..RawListing::default()
    };

    let record = normalize("https://www.amazon.de/dp/B0CXYZ1234", &raw);

    assert_eq!(record.rating, Field::Found(4.6));
    assert_eq!(record.review_count, Field::Found(1234));
}

#[test]
fn unknown_marketplace_falls_back_to_dollars() {
    let raw = RawListing {
        price: text("$12.50"),
        ..RawListing::default()
    };

    let record = normalize("https://shop.example.org/dp/B0CXYZ1234", &raw);

    assert_eq!(record.full_price, Field::Found(Money::new(12.5, Currency::Usd)));
}
