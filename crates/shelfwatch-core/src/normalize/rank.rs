use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::number::parse_count;
use crate::domain::{BestSellerRank, CategoryRank, Field, RawAttributePayload};

/// Keys under which providers report the best-seller rank, tried in order.
const RANK_KEYS: [&str; 9] = [
    "Amazon Bestseller-Rang",
    "Amazon BestsellerRang",
    "Best Sellers Rank",
    "best_sellers_rank",
    "bsr",
    "bestsellers_rank",
    "bestseller_rank",
    "sales_rank",
    "rank",
];

static SEGMENT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Nr\.|#").expect("rank marker regex is valid"));

/// Best-seller rank from `Nr. 912 in Fashion (Siehe Top 100) Nr. 1 in ...`
/// or `#1,234 in Kitchen` text, or from a structured rank payload.
pub fn extract_rank(payload: Option<&RawAttributePayload>) -> Field<BestSellerRank> {
    let entries = match payload {
        None => return Field::NotFound,
        Some(RawAttributePayload::Number(value)) => rank_from_number(*value).into_iter().collect(),
        Some(RawAttributePayload::Text(text)) => ranks_from_text(text),
        Some(RawAttributePayload::Structured(value)) => ranks_from_value(value),
    };

    if entries.is_empty() {
        tracing::warn!(?payload, "best-seller rank not found");
        return Field::NotFound;
    }
    tracing::debug!(?entries, "best-seller rank extracted");
    Field::Found(BestSellerRank { entries })
}

/// Each `Nr.`/`#` segment yields one `(category, rank)` pair.
pub(crate) fn ranks_from_text(text: &str) -> Vec<CategoryRank> {
    SEGMENT_MARKER
        .split(text)
        .filter_map(segment_rank)
        .collect()
}

fn segment_rank(segment: &str) -> Option<CategoryRank> {
    let segment = segment.trim();
    let (rank, category) = match segment.split_once(" in ") {
        Some((rank, category)) => (rank.trim(), category),
        None => (segment, ""),
    };
    if !rank.starts_with(|ch: char| ch.is_ascii_digit()) {
        return None;
    }
    let rank = leading_rank(rank)?;
    Some(CategoryRank {
        category: clean_category(category),
        rank,
    })
}

/// Digits of the first token, thousands separators dropped.
fn leading_rank(text: &str) -> Option<u64> {
    let token = text.split_whitespace().next()?;
    if token.chars().any(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }
    parse_count(token)
}

fn clean_category(category: &str) -> String {
    let category = category.split('(').next().unwrap_or_default();
    category
        .trim()
        .trim_end_matches([',', ';', '|', ':'])
        .trim()
        .to_owned()
}

fn rank_from_number(value: f64) -> Option<CategoryRank> {
    (value.is_finite() && value >= 1.0).then(|| CategoryRank {
        category: String::new(),
        rank: value as u64,
    })
}

fn ranks_from_value(value: &Value) -> Vec<CategoryRank> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .and_then(rank_from_number)
            .into_iter()
            .collect(),
        Value::String(text) => {
            let ranks = ranks_from_text(text);
            if ranks.is_empty() {
                leading_rank(text.trim_start_matches('#'))
                    .map(|rank| CategoryRank {
                        category: String::new(),
                        rank,
                    })
                    .into_iter()
                    .collect()
            } else {
                ranks
            }
        }
        Value::Array(items) => items.iter().flat_map(ranks_from_value).collect(),
        Value::Object(map) if map.contains_key("category") => {
            rank_from_entry(map).into_iter().collect()
        }
        Value::Object(map) => RANK_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .map(ranks_from_value)
            .find(|ranks| !ranks.is_empty())
            .unwrap_or_default(),
        Value::Null | Value::Bool(_) => Vec::new(),
    }
}

fn rank_from_entry(map: &Map<String, Value>) -> Option<CategoryRank> {
    let rank = ["rank", "value"]
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| match value {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => leading_rank(text.trim_start_matches('#')),
            _ => None,
        })?;
    let category = map
        .get("category")
        .and_then(Value::as_str)
        .map(clean_category)
        .unwrap_or_default();
    Some(CategoryRank { category, rank })
}
