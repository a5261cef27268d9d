use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use shelfwatch_core::{
    build_provider, fetch_available, AttributeNormalizer, Field, HttpClient, HttpError,
    HttpMethod, HttpRequest, HttpResponse, ProviderCredentials, ProviderId, RateLimiter,
    ScrapeProvider, ScrapeRequest, SourceErrorKind,
};

const LISTING_URL: &str = "https://www.amazon.de/dp/B0CXYZ1234?th=1";

/// Replays scripted responses and keeps every request it was handed.
#[derive(Default)]
struct ScriptedHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    fn replying(responses: impl IntoIterator<Item = Result<HttpResponse, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().expect("requests lock").push(request);
        let response = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::with_status(500, "script exhausted")));
        Box::pin(async move { response })
    }
}

struct ProviderCase {
    id: ProviderId,
    credentials: ProviderCredentials,
    product_body: String,
    empty_body: String,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::ScrapingDog,
            credentials: ProviderCredentials::ApiKey(String::from("dog-key")),
            product_body: json!({
                "title": "Wool Socks",
                "price": "23,45 €",
                "average_rating": "4,6",
                "total_reviews": "1.234",
                "product_information": {"Best Sellers Rank": "Nr. 912 in Fashion"}
            })
            .to_string(),
            empty_body: json!({"title": "", "price": null}).to_string(),
        },
        ProviderCase {
            id: ProviderId::Oxylabs,
            credentials: ProviderCredentials::Basic {
                username: String::from("oxy-user"),
                password: String::from("oxy-pass"),
            },
            product_body: json!({
                "results": [{
                    "content": {
                        "title": "Wool Socks",
                        "price": 23.45,
                        "rating": 4.6,
                        "reviews_count": 1234,
                        "sales_rank": [{"rank": 912, "ladder": [{"name": "Fashion"}]}]
                    }
                }]
            })
            .to_string(),
            empty_body: json!({"results": []}).to_string(),
        },
        ProviderCase {
            id: ProviderId::ScraperApi,
            credentials: ProviderCredentials::ApiKey(String::from("proxy-key")),
            product_body: String::from(
                r#"<html><body>
                <span id="productTitle"> Wool Socks </span>
                <span id="priceblock_ourprice">23,45 €</span>
                <span id="acrCustomerReviewText">1.234 Sternebewertungen</span>
                <span data-hook="rating-out-of-5">4,6 von 5</span>
                </body></html>"#,
            ),
            empty_body: String::from("<html><body><p>Captcha</p></body></html>"),
        },
    ]
}

fn provider(case: &ProviderCase, http: Arc<ScriptedHttpClient>) -> Arc<dyn ScrapeProvider> {
    build_provider(
        case.id,
        case.credentials.clone(),
        http,
        Arc::new(RateLimiter::new(1, Duration::from_secs(1))),
    )
    .expect("credentials match provider")
}

fn request() -> ScrapeRequest {
    ScrapeRequest::from_url(LISTING_URL).expect("valid listing url")
}

#[tokio::test(start_paused = true)]
async fn product_payload_normalizes_for_every_provider() {
    for case in provider_cases() {
        let http = Arc::new(ScriptedHttpClient::replying([Ok(HttpResponse::ok(
            case.product_body.clone(),
        ))]));
        let provider = provider(&case, http.clone());
        assert_eq!(provider.id(), case.id);

        let request = request();
        let raw = provider
            .fetch(&request)
            .await
            .unwrap_or_else(|error| panic!("{}: fetch failed: {error}", case.id));
        let record = AttributeNormalizer::new().normalize(
            request.listing.clone(),
            &request.url,
            &request.market,
            &raw,
            Utc::now(),
        );

        assert_eq!(record.listing_id.as_str(), "B0CXYZ1234", "{}", case.id);
        match record.full_price {
            Field::Found(money) => assert_eq!(money.cents_rounded(), 23.45, "{}", case.id),
            Field::NotFound => panic!("{}: price not found", case.id),
        }
        assert_eq!(record.review_count, Field::Found(1234), "{}", case.id);
        assert_eq!(http.requests().len(), 1, "{}", case.id);
    }
}

#[tokio::test(start_paused = true)]
async fn empty_payload_is_not_found_for_every_provider() {
    for case in provider_cases() {
        let http = Arc::new(ScriptedHttpClient::replying([Ok(HttpResponse::ok(
            case.empty_body.clone(),
        ))]));
        let error = provider(&case, http)
            .fetch(&request())
            .await
            .expect_err("empty payload");
        assert_eq!(error.kind(), SourceErrorKind::NotFound, "{}", case.id);
    }
}

#[tokio::test(start_paused = true)]
async fn missing_listing_is_not_retried() {
    for case in provider_cases() {
        let http = Arc::new(ScriptedHttpClient::replying([Ok(HttpResponse::with_status(
            404, "gone",
        ))]));
        let provider = provider(&case, http.clone());

        assert!(fetch_available(provider.as_ref(), &request()).await.is_none());
        assert_eq!(http.requests().len(), 1, "{}", case.id);
    }
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_with_backoff() {
    for case in provider_cases() {
        let http = Arc::new(ScriptedHttpClient::replying([
            Ok(HttpResponse::with_status(503, "busy")),
            Err(HttpError::new("connection reset")),
            Ok(HttpResponse::ok(case.product_body.clone())),
        ]));
        let provider = provider(&case, http.clone());
        let started = tokio::time::Instant::now();

        provider
            .fetch(&request())
            .await
            .unwrap_or_else(|error| panic!("{}: retries exhausted: {error}", case.id));

        assert_eq!(http.requests().len(), 3, "{}", case.id);
        // 2 s then 4 s of backoff.
        assert!(started.elapsed() >= Duration::from_secs(6), "{}", case.id);
    }
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_last_error() {
    for case in provider_cases() {
        let http = Arc::new(ScriptedHttpClient::replying(
            (0..4).map(|_| Ok(HttpResponse::with_status(429, "slow down"))),
        ));
        let error = provider(&case, http.clone())
            .fetch(&request())
            .await
            .expect_err("always rate limited");

        assert_eq!(error.kind(), SourceErrorKind::RateLimited, "{}", case.id);
        assert_eq!(http.requests().len(), 4, "{}", case.id);
    }
}

#[tokio::test(start_paused = true)]
async fn requests_carry_provider_credentials() {
    let cases = provider_cases();

    let http = Arc::new(ScriptedHttpClient::replying([Ok(HttpResponse::ok(
        cases[0].product_body.clone(),
    ))]));
    provider(&cases[0], http.clone())
        .fetch(&request())
        .await
        .expect("scrapingdog fetch");
    let sent = &http.requests()[0];
    assert_eq!(sent.method, HttpMethod::Get);
    assert_eq!(sent.query_value("api_key"), Some("dog-key"));
    assert_eq!(sent.query_value("asin"), Some("B0CXYZ1234"));
    assert_eq!(sent.query_value("domain"), Some("de"));

    let http = Arc::new(ScriptedHttpClient::replying([Ok(HttpResponse::ok(
        cases[1].product_body.clone(),
    ))]));
    provider(&cases[1], http.clone())
        .fetch(&request())
        .await
        .expect("oxylabs fetch");
    let sent = &http.requests()[0];
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.timeout_ms, 60_000);
    let body: serde_json::Value =
        serde_json::from_str(sent.body.as_deref().expect("json body")).expect("valid json");
    assert_eq!(body["source"], "amazon");
    assert_eq!(body["parse"], true);

    let http = Arc::new(ScriptedHttpClient::replying([Ok(HttpResponse::ok(
        cases[2].product_body.clone(),
    ))]));
    provider(&cases[2], http.clone())
        .fetch(&request())
        .await
        .expect("scraperapi fetch");
    let sent = &http.requests()[0];
    assert_eq!(sent.query_value("api_key"), Some("proxy-key"));
    assert_eq!(
        sent.query_value("url"),
        Some("https://www.amazon.de/dp/B0CXYZ1234")
    );
}

#[test]
fn mismatched_credentials_are_rejected() {
    let http: Arc<dyn HttpClient> = Arc::new(ScriptedHttpClient::default());
    let result = build_provider(
        ProviderId::ScrapingDog,
        ProviderCredentials::Basic {
            username: String::from("user"),
            password: String::from("pass"),
        },
        http,
        Arc::new(RateLimiter::new(1, Duration::from_secs(1))),
    );
    assert!(result.is_err());
}
