mod oxylabs;
mod scraperapi;
mod scrapingdog;

use std::sync::Arc;

pub use oxylabs::OxylabsAdapter;
pub use scraperapi::ScraperApiAdapter;
pub use scrapingdog::ScrapingDogAdapter;

use crate::domain::RawListing;
use crate::http_client::HttpClient;
use crate::provider::{ScrapeProvider, SourceError};
use crate::throttling::RateLimiter;
use crate::{ProviderId, ValidationError};

/// Credentials for whichever provider is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCredentials {
    ApiKey(String),
    Basic { username: String, password: String },
}

/// Builds the adapter for `provider`, sharing one limiter across every call
/// made through it.
pub fn build_provider(
    provider: ProviderId,
    credentials: ProviderCredentials,
    http_client: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
) -> Result<Arc<dyn ScrapeProvider>, ValidationError> {
    match (provider, credentials) {
        (ProviderId::ScraperApi, ProviderCredentials::ApiKey(key)) => {
            Ok(Arc::new(ScraperApiAdapter::new(key, http_client, limiter)))
        }
        (ProviderId::ScrapingDog, ProviderCredentials::ApiKey(key)) => {
            Ok(Arc::new(ScrapingDogAdapter::new(key, http_client, limiter)))
        }
        (ProviderId::Oxylabs, ProviderCredentials::Basic { username, password }) => Ok(Arc::new(
            OxylabsAdapter::new(username, password, http_client, limiter),
        )),
        (ProviderId::ScraperApi, _) => Err(ValidationError::MissingConfigKey {
            key: String::from("ScraperAPI"),
        }),
        (ProviderId::ScrapingDog, _) => Err(ValidationError::MissingConfigKey {
            key: String::from("ScrapingDogAPIKey"),
        }),
        (ProviderId::Oxylabs, _) => Err(ValidationError::MissingConfigKey {
            key: String::from("oxylabs_username"),
        }),
    }
}

/// Maps a saved provider response body (JSON, or HTML for ScraperAPI) the
/// same way a live fetch would.
pub fn parse_payload(provider: ProviderId, body: &str) -> Result<RawListing, SourceError> {
    match provider {
        ProviderId::ScraperApi => scraperapi::parse_response(body),
        ProviderId::ScrapingDog => scrapingdog::parse_response(body),
        ProviderId::Oxylabs => oxylabs::parse_response(body),
    }
}
