use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Currency, Field, ListingCode};

/// A price in the listing's marketplace currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Money {
    pub amount: f64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Amount rounded to cents, as written into numeric grid cells.
    pub fn cents_rounded(self) -> f64 {
        (self.amount * 100.0).round() / 100.0
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency.symbol())
    }
}

/// A percentage value such as a coupon or a computed discount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Percent(pub f64);

impl Percent {
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

/// One `(category, rank)` pair of a best-seller ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRank {
    pub category: String,
    pub rank: u64,
}

/// Best-seller rank, possibly across several categories.
///
/// Entries keep source order; the first entry is the headline rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestSellerRank {
    pub entries: Vec<CategoryRank>,
}

impl BestSellerRank {
    pub fn primary(&self) -> Option<&CategoryRank> {
        self.entries.first()
    }

    pub fn rank_in(&self, category: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| entry.rank)
    }
}

/// Canonical, provider-agnostic listing record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub listing_id: ListingCode,
    pub title: Field<String>,
    pub full_price: Field<Money>,
    pub prime_price: Field<Money>,
    pub list_price: Field<Money>,
    pub coupon_percent: Field<Percent>,
    pub final_price: Field<Money>,
    pub discount_percent: Field<Percent>,
    pub rating: Field<f64>,
    pub review_count: Field<u64>,
    pub best_seller_rank: Field<BestSellerRank>,
    pub brand: Field<String>,
    pub scrape_timestamp: DateTime<Utc>,
    pub source_url: String,
}

impl ProductRecord {
    pub fn headline_rank(&self) -> Field<u64> {
        self.best_seller_rank
            .as_ref()
            .and_then(|rank| rank.primary().map(|entry| entry.rank).into())
    }
}
