use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::{RawAttributePayload, RawListing};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{send_with_retry, ScrapeProvider, ScrapeRequest, SourceError};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::RateLimiter;
use crate::ProviderId;

const ENDPOINT: &str = "https://api.scrapingdog.com/amazon/product";

/// ScrapingDog product API adapter (JSON payloads).
#[derive(Clone)]
pub struct ScrapingDogAdapter {
    api_key: String,
    http_client: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
    policy: ProviderPolicy,
}

impl ScrapingDogAdapter {
    pub fn new(
        api_key: impl Into<String>,
        http_client: Arc<dyn HttpClient>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            http_client,
            limiter,
            policy: ProviderPolicy::default_for(ProviderId::ScrapingDog),
        }
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn build_request(&self, request: &ScrapeRequest) -> HttpRequest {
        // The API names the British marketplace `uk`.
        let country = match request.market.country {
            "gb" => "uk",
            other => other,
        };
        HttpRequest::get(ENDPOINT)
            .with_query("api_key", &self.api_key)
            .with_query("asin", request.listing.as_str())
            .with_query("domain", request.market.marketplace_domain())
            .with_query("country", country)
            .with_timeout_ms(self.policy.timeout_ms)
    }
}

impl ScrapeProvider for ScrapingDogAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::ScrapingDog
    }

    fn fetch<'a>(
        &'a self,
        request: &'a ScrapeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawListing, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let response = send_with_retry(
                self.id(),
                self.http_client.as_ref(),
                &self.limiter,
                &self.policy.retry,
                self.build_request(request),
            )
            .await?;

            parse_response(&response.body)
        })
    }
}

/// Maps a product API body; an attribute-free product is not found.
pub(crate) fn parse_response(body: &str) -> Result<RawListing, SourceError> {
    let payload: Value = serde_json::from_str(body).map_err(|error| {
        SourceError::internal(format!("scrapingdog returned invalid json: {error}"))
    })?;
    let raw = map_product(&payload);
    if raw.is_empty() {
        return Err(SourceError::not_found("scrapingdog returned no attributes"));
    }
    Ok(raw)
}

fn map_product(product: &Value) -> RawListing {
    let field = |key: &str| product.get(key).and_then(RawAttributePayload::from_json);

    let prime_exclusive = match product.get("is_prime_exclusive") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
        _ => false,
    };

    RawListing {
        title: field("title"),
        brand: field("brand"),
        price: field("price"),
        list_price: field("previous_price"),
        prime_price: None,
        prime_message: if prime_exclusive {
            field("prime_exclusive_message")
        } else {
            None
        },
        coupon: field("coupon_text"),
        rating: field("average_rating"),
        rating_text: None,
        review_count: field("total_reviews"),
        best_seller_rank: field("product_information"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::testing::RecordingHttpClient;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::provider::SourceErrorKind;

    fn adapter(client: Arc<RecordingHttpClient>) -> ScrapingDogAdapter {
        ScrapingDogAdapter::new(
            "dog-key",
            client,
            Arc::new(RateLimiter::new(1, Duration::from_secs(1))),
        )
    }

    fn product_json() -> String {
        serde_json::json!({
            "title": "Merino Laufshirt",
            "brand": "Besuche den Acme-Store",
            "price": "49,99 €",
            "previous_price": "59,99 €",
            "coupon_text": "Spare 10 Prozent",
            "average_rating": 4.5,
            "total_reviews": "1.204",
            "is_prime_exclusive": "true",
            "prime_exclusive_message": "Prime-Mitglieder kaufen diesen Artikel bei 44,99 € (function(){})",
            "product_information": {
                "Amazon Bestseller-Rang": "Nr. 912 in Fashion (Siehe Top 100) Nr. 1 in Sportunterhemden"
            }
        })
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn maps_product_payload_and_shapes_query() {
        let client = Arc::new(RecordingHttpClient::replying([Ok(HttpResponse::ok(product_json()))]));
        let request = ScrapeRequest::from_url("https://www.amazon.de/dp/B0CXYZ1234").expect("url");

        let raw = adapter(client.clone()).fetch(&request).await.expect("listing");

        assert!(raw.prime_message.is_some());
        assert_eq!(raw.list_price, RawAttributePayload::text("59,99 €"));
        assert!(matches!(raw.best_seller_rank, Some(RawAttributePayload::Structured(_))));

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query_value("asin"), Some("B0CXYZ1234"));
        assert_eq!(requests[0].query_value("domain"), Some("de"));
        assert_eq!(requests[0].query_value("country"), Some("de"));
        assert_eq!(requests[0].query_value("api_key"), Some("dog-key"));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_then_succeeds() {
        let client = Arc::new(RecordingHttpClient::replying([
            Err(HttpError::new("connection reset")),
            Ok(HttpResponse::with_status(503, "busy")),
            Ok(HttpResponse::ok(product_json())),
        ]));
        let request = ScrapeRequest::from_url("https://www.amazon.co.uk/dp/B0CXYZ1234").expect("url");

        adapter(client.clone()).fetch(&request).await.expect("third attempt succeeds");

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].query_value("country"), Some("uk"));
        assert_eq!(requests[0].query_value("domain"), Some("co.uk"));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_credentials_are_not_retried() {
        let client = Arc::new(RecordingHttpClient::replying([Ok(HttpResponse::with_status(
            401,
            "unauthorized",
        ))]));
        let request = ScrapeRequest::from_url("https://www.amazon.de/dp/B0CXYZ1234").expect("url");

        let error = adapter(client.clone()).fetch(&request).await.expect_err("401");
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
        assert_eq!(client.recorded_requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_payload_is_not_found() {
        let client = Arc::new(RecordingHttpClient::replying([Ok(HttpResponse::ok("{}"))]));
        let request = ScrapeRequest::from_url("https://www.amazon.de/dp/B0CXYZ1234").expect("url");

        let error = adapter(client).fetch(&request).await.expect_err("empty");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }
}
