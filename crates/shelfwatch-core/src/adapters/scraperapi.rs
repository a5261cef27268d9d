use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::domain::{RawAttributePayload, RawListing};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{send_with_retry, ScrapeProvider, ScrapeRequest, SourceError};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::RateLimiter;
use crate::ProviderId;

const ENDPOINT: &str = "http://api.scraperapi.com";

const PRICE_SELECTORS: [&str; 4] = [
    "#priceblock_ourprice",
    "#priceblock_dealprice",
    "#priceblock_saleprice",
    "span.a-offscreen",
];
const LIST_PRICE_SELECTORS: [&str; 1] = ["span.a-price.a-text-price span.a-offscreen"];
const COUPON_SELECTORS: [&str; 2] = ["#couponBadgeRegular", "#couponBadgeSecondary"];
const RATING_TEXT_SELECTORS: [&str; 2] = ["span[data-hook='rating-out-of-5']", "span.a-icon-alt"];
const RANK_LABELS: [&str; 2] = ["Bestseller-Rang", "Best Sellers Rank"];

/// ScraperAPI proxy adapter; the product page HTML is parsed locally.
#[derive(Clone)]
pub struct ScraperApiAdapter {
    api_key: String,
    http_client: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
    policy: ProviderPolicy,
}

impl ScraperApiAdapter {
    pub fn new(
        api_key: impl Into<String>,
        http_client: Arc<dyn HttpClient>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            http_client,
            limiter,
            policy: ProviderPolicy::default_for(ProviderId::ScraperApi),
        }
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn build_request(&self, request: &ScrapeRequest) -> HttpRequest {
        HttpRequest::get(ENDPOINT)
            .with_query("api_key", &self.api_key)
            .with_query("url", target_url(&request.url))
            .with_query("render", "false")
            .with_query("keep_headers", "true")
            .with_query("country_code", request.market.country)
            .with_timeout_ms(self.policy.timeout_ms)
    }
}

impl ScrapeProvider for ScraperApiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::ScraperApi
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

/// Product URL without tracking query parameters.
fn target_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!(
            "https://{}{}",
            parsed.host_str().unwrap_or("www.amazon.com"),
            parsed.path()
        ),
        Err(_) => url.to_owned(),
    }
}

/// Parses a proxied product page; a page without any known element is not found.
pub(crate) fn parse_response(html: &str) -> Result<RawListing, SourceError> {
    let raw = parse_product_page(html);
    if raw.is_empty() {
        return Err(SourceError::not_found(
            "scraperapi page has no recognizable attributes",
        ));
    }
    Ok(raw)
}

pub(crate) fn parse_product_page(html: &str) -> RawListing {
    let doc = Html::parse_document(html);
    let text_at = |selectors: &[&str]| first_text(&doc, selectors).and_then(RawAttributePayload::text);

    RawListing {
        title: text_at(&["#productTitle"]),
        brand: text_at(&["#bylineInfo"]),
        price: text_at(&PRICE_SELECTORS),
        list_price: text_at(&LIST_PRICE_SELECTORS),
        prime_price: None,
        prime_message: None,
        coupon: text_at(&COUPON_SELECTORS),
        rating: embedded_rating(&doc),
        rating_text: text_at(&RATING_TEXT_SELECTORS),
        review_count: text_at(&["#acrCustomerReviewText"]),
        best_seller_rank: rank_text(&doc).and_then(RawAttributePayload::text),
    }
}

/// Text of the first element matched, trying selectors in priority order.
fn first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|selector_str| {
        let selector = Selector::parse(selector_str).ok()?;
        doc.select(&selector)
            .map(|element| element_text(&element))
            .find(|text| !text.is_empty())
    })
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `aggregateRating` from embedded JSON-LD metadata.
fn embedded_rating(doc: &Html) -> Option<RawAttributePayload> {
    let selector = Selector::parse("script[type='application/ld+json']").ok()?;
    doc.select(&selector).find_map(|script| {
        let data: Value = serde_json::from_str(&script.text().collect::<String>()).ok()?;
        data.get("aggregateRating")
            .and_then(RawAttributePayload::from_json)
    })
}

/// Best-seller rank text from the product details table or the detail bullets.
fn rank_text(doc: &Html) -> Option<String> {
    let is_rank_label = |text: &str| RANK_LABELS.iter().any(|label| text.contains(label));

    if let (Ok(rows), Ok(th), Ok(td)) = (
        Selector::parse("#productDetails_detailBullets_sections1 tr"),
        Selector::parse("th"),
        Selector::parse("td"),
    ) {
        for row in doc.select(&rows) {
            let key = row.select(&th).next().map(|cell| element_text(&cell));
            let value = row.select(&td).next().map(|cell| element_text(&cell));
            if let (Some(key), Some(value)) = (key, value) {
                if is_rank_label(&key) {
                    tracing::debug!(%value, "rank found in product details");
                    return Some(value);
                }
            }
        }
    }

    let bullets = Selector::parse("#detailBulletsWrapper_feature_div li").ok()?;
    doc.select(&bullets)
        .map(|item| element_text(&item))
        .find(|text| is_rank_label(text))
        .and_then(|text| text.split_once(':').map(|(_, rank)| rank.trim().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::testing::RecordingHttpClient;
    use crate::http_client::HttpResponse;

    const PAGE: &str = r#"
        <html><head>
          <script type="application/ld+json">{"aggregateRating": {"ratingValue": "4.6"}}</script>
        </head><body>
          <span id="productTitle">  Merino   Laufshirt </span>
          <a id="bylineInfo">Besuche den Acme-Store</a>
          <span class="a-price"><span class="a-offscreen">49,99 €</span></span>
          <span class="a-price a-text-price"><span class="a-offscreen">59,99 €</span></span>
          <span id="couponBadgeRegular">5 Prozent Coupon</span>
          <span id="acrCustomerReviewText">1.204 Sternebewertungen</span>
          <table id="productDetails_detailBullets_sections1">
            <tr><th>Hersteller</th><td>Acme</td></tr>
            <tr><th>Amazon Bestseller-Rang</th><td>Nr. 912 in Fashion (Siehe Top 100) Nr. 1 in Sportunterhemden</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn parses_product_page_attributes() {
        let raw = parse_product_page(PAGE);

        assert_eq!(raw.title, RawAttributePayload::text("Merino Laufshirt"));
        assert_eq!(raw.price, RawAttributePayload::text("49,99 €"));
        assert_eq!(raw.list_price, RawAttributePayload::text("59,99 €"));
        assert_eq!(raw.coupon, RawAttributePayload::text("5 Prozent Coupon"));
        assert!(matches!(raw.rating, Some(RawAttributePayload::Structured(_))));
        assert_eq!(
            raw.best_seller_rank,
            RawAttributePayload::text("Nr. 912 in Fashion (Siehe Top 100) Nr. 1 in Sportunterhemden")
        );
    }

    #[test]
    fn rank_falls_back_to_detail_bullets() {
        let page = r#"<div id="detailBulletsWrapper_feature_div"><ul>
            <li>Hersteller : Acme</li>
            <li>Amazon Bestseller-Rang: Nr. 2.366 in Drogerie</li>
        </ul></div>"#;
        let raw = parse_product_page(page);
        assert_eq!(raw.best_seller_rank, RawAttributePayload::text("Nr. 2.366 in Drogerie"));
    }

    #[tokio::test(start_paused = true)]
    async fn proxies_clean_target_url() {
        let client = Arc::new(RecordingHttpClient::replying([Ok(HttpResponse::ok(PAGE))]));
        let adapter = ScraperApiAdapter::new(
            "scraper-key",
            client.clone(),
            Arc::new(RateLimiter::new(1, Duration::from_secs(1))),
        );
        let request =
            ScrapeRequest::from_url("https://www.amazon.de/dp/B0CXYZ1234?ref=abc&th=1").expect("url");

        adapter.fetch(&request).await.expect("listing");

        let requests = client.recorded_requests();
        assert_eq!(
            requests[0].query_value("url"),
            Some("https://www.amazon.de/dp/B0CXYZ1234")
        );
        assert_eq!(requests[0].query_value("render"), Some("false"));
        assert_eq!(requests[0].query_value("country_code"), Some("de"));
    }
}
