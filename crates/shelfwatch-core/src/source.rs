use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Scraping providers that can supply raw listing payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    ScraperApi,
    ScrapingDog,
    Oxylabs,
}

impl ProviderId {
    pub const ALL: [Self; 3] = [Self::ScraperApi, Self::ScrapingDog, Self::Oxylabs];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScraperApi => "scraperapi",
            Self::ScrapingDog => "scrapingdog",
            Self::Oxylabs => "oxylabs",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scraperapi" => Ok(Self::ScraperApi),
            "scrapingdog" => Ok(Self::ScrapingDog),
            "oxylabs" => Ok(Self::Oxylabs),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names_case_insensitively() {
        assert_eq!("ScraperAPI".parse::<ProviderId>(), Ok(ProviderId::ScraperApi));
        assert_eq!(" oxylabs ".parse::<ProviderId>(), Ok(ProviderId::Oxylabs));
        assert!(matches!(
            "zenrows".parse::<ProviderId>(),
            Err(ValidationError::InvalidProvider { .. })
        ));
    }
}
