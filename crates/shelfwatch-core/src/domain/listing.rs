use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

const LISTING_CODE_LEN: usize = 10;

static PATH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/dp/([A-Z0-9]{10})",
        r"/gp/product/([A-Z0-9]{10})",
        r"/product/([A-Z0-9]{10})",
        r"/ASIN/([A-Z0-9]{10})",
        r"/gp/aw/d/([A-Z0-9]{10})",
        r"/gp/offer-listing/([A-Z0-9]{10})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("listing path pattern is valid"))
    .collect()
});

static ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z0-9]{10}").expect("listing code pattern is valid"));

/// 10-character marketplace item code (ASIN).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListingCode(String);

impl ListingCode {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let valid = trimmed.len() == LISTING_CODE_LEN
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit());
        if !valid {
            return Err(ValidationError::InvalidListingCode {
                value: trimmed.to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Extracts the code from a product URL: known path shapes first, then
    /// an `asin` query parameter, then any code-shaped run in the URL.
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url.trim()).ok();
        let path = parsed.as_ref().map(Url::path).unwrap_or(url);

        for pattern in PATH_PATTERNS.iter() {
            if let Some(code) = pattern.captures(path).and_then(|c| c.get(1)) {
                tracing::debug!(code = code.as_str(), url, "listing code from path");
                return Some(Self(code.as_str().to_owned()));
            }
        }

        if let Some(parsed) = &parsed {
            if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "asin") {
                if let Ok(code) = Self::parse(&value) {
                    tracing::debug!(code = code.as_str(), url, "listing code from query");
                    return Some(code);
                }
            }
        }

        if let Some(found) = ANYWHERE.find(url) {
            tracing::debug!(code = found.as_str(), url, "listing code from url body");
            return Some(Self(found.as_str().to_owned()));
        }

        tracing::warn!(url, "could not extract listing code");
        None
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ListingCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ListingCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ListingCode> for String {
    fn from(value: ListingCode) -> Self {
        value.0
    }
}
