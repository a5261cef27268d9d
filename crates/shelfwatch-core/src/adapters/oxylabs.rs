use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::domain::{RawAttributePayload, RawListing};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{send_with_retry, ScrapeProvider, ScrapeRequest, SourceError};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::RateLimiter;
use crate::ProviderId;

const ENDPOINT: &str = "https://realtime.oxylabs.io/v1/queries";

/// Oxylabs realtime adapter; parsed content lives at `results[0].content`.
#[derive(Clone)]
pub struct OxylabsAdapter {
    auth: HttpAuth,
    http_client: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
    policy: ProviderPolicy,
}

impl OxylabsAdapter {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        http_client: Arc<dyn HttpClient>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            auth: HttpAuth::Basic {
                username: username.into(),
                password: password.into(),
            },
            http_client,
            limiter,
            policy: ProviderPolicy::default_for(ProviderId::Oxylabs),
        }
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn build_request(&self, request: &ScrapeRequest) -> HttpRequest {
        HttpRequest::post(ENDPOINT)
            .with_auth(self.auth.clone())
            .with_json_body(&json!({
                "source": "amazon",
                "url": request.url,
                "parse": true,
            }))
            .with_timeout_ms(self.policy.timeout_ms)
    }
}

impl ScrapeProvider for OxylabsAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Oxylabs
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

const LIST_PRICE_KEYS: [&str; 5] = [
    "price_strikethrough",
    "list_price",
    "was_price",
    "original_price",
    "old_price",
];

/// Maps `results[0].content` of a realtime query body.
pub(crate) fn parse_response(body: &str) -> Result<RawListing, SourceError> {
    let payload: Value = serde_json::from_str(body).map_err(|error| {
        SourceError::internal(format!("oxylabs returned invalid json: {error}"))
    })?;
    let content = payload
        .pointer("/results/0/content")
        .filter(|content| content.is_object())
        .ok_or_else(|| SourceError::not_found("oxylabs response has no parsed content"))?;

    let raw = map_content(content);
    if raw.is_empty() {
        return Err(SourceError::not_found("oxylabs returned no attributes"));
    }
    Ok(raw)
}

fn map_content(content: &Value) -> RawListing {
    let field = |key: &str| content.get(key).and_then(RawAttributePayload::from_json);
    let first_of = |keys: &[&str]| keys.iter().find_map(|key| field(*key));

    RawListing {
        title: field("title"),
        brand: field("brand"),
        price: field("price"),
        list_price: first_of(&LIST_PRICE_KEYS),
        prime_price: field("prime_offer_price"),
        prime_message: None,
        coupon: field("coupon"),
        rating: field("rating"),
        rating_text: None,
        // The rank and review extractors resolve their own key aliases.
        review_count: subset(content, &REVIEW_KEYS),
        best_seller_rank: subset(content, &RANK_KEYS),
    }
}

const REVIEW_KEYS: [&str; 4] = ["reviews_count", "review_count", "rating_count", "ratings_total"];

const RANK_KEYS: [&str; 5] = [
    "best_sellers_rank",
    "bsr",
    "bestsellers_rank",
    "bestseller_rank",
    "sales_rank",
];

/// Object holding only the non-null `keys` of `content`.
fn subset(content: &Value, keys: &[&str]) -> Option<RawAttributePayload> {
    let map: Map<String, Value> = keys
        .iter()
        .filter_map(|key| {
            content
                .get(*key)
                .filter(|value| !value.is_null())
                .map(|value| ((*key).to_owned(), value.clone()))
        })
        .collect();
    RawAttributePayload::from_json(&Value::Object(map))
}
