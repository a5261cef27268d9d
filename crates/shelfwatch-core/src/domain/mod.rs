//! Domain models for listings, canonical records and time slots.

pub mod company;
pub mod field;
pub mod listing;
pub mod marketplace;
pub mod payload;
pub mod record;
pub mod slot;

pub use company::CompanyGroup;
pub use field::Field;
pub use listing::ListingCode;
pub use marketplace::{Currency, MarketHint};
pub use payload::{RawAttributePayload, RawListing};
pub use record::{BestSellerRank, CategoryRank, Money, Percent, ProductRecord};
pub use slot::{parse_slots, TimeSlot};
