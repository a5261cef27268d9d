use std::fmt::{Display, Formatter};

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Currencies the marketplaces price listings in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    Gbp,
    Jpy,
    Cad,
    Aud,
    Chf,
    Cny,
    Inr,
    Brl,
    Aed,
    Sek,
    Sgd,
}

impl Currency {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
            Self::Chf => "CHF",
            Self::Cny => "CNY",
            Self::Inr => "INR",
            Self::Brl => "BRL",
            Self::Aed => "AED",
            Self::Sek => "SEK",
            Self::Sgd => "SGD",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eur => "€",
            Self::Usd => "$",
            Self::Gbp => "£",
            Self::Jpy | Self::Cny => "¥",
            Self::Cad => "C$",
            Self::Aud => "A$",
            Self::Chf => "CHF",
            Self::Inr => "₹",
            Self::Brl => "R$",
            Self::Aed => "د.إ",
            Self::Sek => "kr",
            Self::Sgd => "S$",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Domain suffix, currency, provider country code.
const MARKETPLACES: &[(&str, Currency, &str)] = &[
    ("amazon.com.au", Currency::Aud, "au"),
    ("amazon.com.br", Currency::Brl, "br"),
    ("amazon.co.uk", Currency::Gbp, "gb"),
    ("amazon.co.jp", Currency::Jpy, "jp"),
    ("amazon.com", Currency::Usd, "us"),
    ("amazon.de", Currency::Eur, "de"),
    ("amazon.fr", Currency::Eur, "fr"),
    ("amazon.it", Currency::Eur, "it"),
    ("amazon.es", Currency::Eur, "es"),
    ("amazon.nl", Currency::Eur, "nl"),
    ("amazon.ca", Currency::Cad, "ca"),
    ("amazon.se", Currency::Sek, "se"),
    ("amazon.sg", Currency::Sgd, "sg"),
    ("amazon.in", Currency::Inr, "in"),
    ("amazon.ae", Currency::Aed, "ae"),
];

/// Currency and country resolved from a listing URL's domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketHint {
    /// Lower-cased host, e.g. `www.amazon.de`.
    pub host: String,
    pub currency: Currency,
    pub country: &'static str,
    /// Whether the host matched the marketplace table.
    pub known: bool,
}

impl MarketHint {
    /// Resolves the hint for a listing URL. Unknown domains fall back to
    /// USD/us, which is a supported outcome rather than an error.
    pub fn from_url(url: &str) -> Self {
        let host = Url::parse(url.trim())
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_default();
        Self::from_host(&host)
    }

    pub fn from_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        for &(suffix, currency, country) in MARKETPLACES {
            if host.ends_with(suffix) {
                tracing::debug!(%host, currency = currency.code(), "resolved marketplace");
                return Self {
                    host,
                    currency,
                    country,
                    known: true,
                };
            }
        }

        tracing::warn!(%host, "unknown marketplace domain, defaulting to USD/us");
        Self {
            host,
            currency: Currency::Usd,
            country: "us",
            known: false,
        }
    }

    /// Top-level domain part after `amazon.`, e.g. `de`, `co.uk`, `com`.
    pub fn marketplace_domain(&self) -> &str {
        self.host
            .find("amazon.")
            .map(|index| &self.host[index + "amazon.".len()..])
            .filter(|tld| !tld.is_empty())
            .unwrap_or("com")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_german_marketplace() {
        let hint = MarketHint::from_url("https://www.amazon.de/dp/B0CXYZ1234");
        assert_eq!(hint.currency, Currency::Eur);
        assert_eq!(hint.country, "de");
        assert_eq!(hint.marketplace_domain(), "de");
        assert!(hint.known);
    }

    #[test]
    fn distinguishes_com_from_com_au() {
        assert_eq!(
            MarketHint::from_host("www.amazon.com.au").currency,
            Currency::Aud
        );
        assert_eq!(MarketHint::from_host("www.amazon.com").currency, Currency::Usd);
        assert_eq!(
            MarketHint::from_host("www.amazon.co.uk").marketplace_domain(),
            "co.uk"
        );
    }

    #[test]
    fn unknown_domain_defaults_to_usd() {
        let hint = MarketHint::from_url("https://shop.example.org/item/1");
        assert_eq!(hint.currency, Currency::Usd);
        assert_eq!(hint.country, "us");
        assert!(!hint.known);
    }
}
