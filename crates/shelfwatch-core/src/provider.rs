use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::domain::{ListingCode, MarketHint, RawListing};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::throttling::RateLimiter;
use crate::ProviderId;

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    NotFound,
    Internal,
}

/// Structured provider error; `retryable` drives the adapter retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// One listing to scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub listing: ListingCode,
    pub url: String,
    pub market: MarketHint,
}

impl ScrapeRequest {
    /// Resolves the listing code and marketplace from a product URL.
    pub fn from_url(url: &str) -> Result<Self, SourceError> {
        let url = url.trim();
        if !url.starts_with("http") {
            return Err(SourceError::invalid_request(format!(
                "listing url '{url}' must be absolute"
            )));
        }
        let listing = ListingCode::from_url(url).ok_or_else(|| {
            SourceError::invalid_request(format!("no listing code in url '{url}'"))
        })?;
        Ok(Self {
            listing,
            url: url.to_owned(),
            market: MarketHint::from_url(url),
        })
    }
}

/// Scrape-provider adapter contract.
///
/// Implementations absorb authentication and request shaping and map the
/// provider payload into a [`RawListing`]. An empty parse is reported as
/// [`SourceErrorKind::NotFound`].
pub trait ScrapeProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn fetch<'a>(
        &'a self,
        request: &'a ScrapeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawListing, SourceError>> + Send + 'a>>;
}

/// Fetches a listing, collapsing every failure into "not available".
pub async fn fetch_available(
    provider: &dyn ScrapeProvider,
    request: &ScrapeRequest,
) -> Option<RawListing> {
    match provider.fetch(request).await {
        Ok(raw) => Some(raw),
        Err(error) => {
            tracing::warn!(
                provider = %provider.id(),
                listing = %request.listing,
                url = %request.url,
                %error,
                "listing not available"
            );
            None
        }
    }
}

/// Shared transport step of every adapter: waits for the provider's limiter
/// before each attempt, then classifies the response.
pub(crate) async fn send_with_retry(
    provider: ProviderId,
    http_client: &dyn HttpClient,
    limiter: &RateLimiter,
    retry: &RetryConfig,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    retry
        .run(
            |attempt| {
                let request = request.clone();
                async move {
                    limiter.wait().await;
                    tracing::debug!(%provider, attempt, url = %request.url, "provider request");
                    let response = http_client.execute(request).await.map_err(|error| {
                        if error.retryable() {
                            SourceError::unavailable(format!(
                                "{provider} transport error: {}",
                                error.message()
                            ))
                        } else {
                            SourceError::internal(format!(
                                "{provider} transport error: {}",
                                error.message()
                            ))
                        }
                    })?;
                    classify_status(provider, retry, response)
                }
            },
            SourceError::retryable,
        )
        .await
}

fn classify_status(
    provider: ProviderId,
    retry: &RetryConfig,
    response: HttpResponse,
) -> Result<HttpResponse, SourceError> {
    if response.is_success() {
        return Ok(response);
    }
    let message = format!("{provider} upstream returned status {}", response.status);
    Err(match response.status {
        429 => SourceError::rate_limited(message),
        404 => SourceError::not_found(message),
        status if retry.should_retry_status(status) => SourceError::unavailable(message),
        400..=499 => SourceError::invalid_request(message),
        _ => SourceError::internal(message),
    })
}
