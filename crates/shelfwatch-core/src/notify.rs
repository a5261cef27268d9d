//! Cycle summaries, threshold alerts and the chat delivery channel.

use std::fmt::{Display, Formatter, Write as _};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::{CompanyGroup, Field, ListingCode, Money, Percent, ProductRecord};
use crate::http_client::{HttpClient, HttpRequest};

const TELEGRAM_API: &str = "https://api.telegram.org";
const MISSING: &str = "Not found";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(String),
    #[error("notification endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Delivery channel for plain-text cycle reports.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Telegram Bot API `sendMessage`.
#[derive(Clone)]
pub struct TelegramNotifier {
    http_client: Arc<dyn HttpClient>,
    bot_token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            base_url: TELEGRAM_API.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let request = HttpRequest::post(format!("{}/bot{}/sendMessage", self.base_url, self.bot_token))
            .with_json_body(&json!({ "chat_id": self.chat_id, "text": message }));
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| NotifyError::Transport(error.message().to_owned()))?;
        if !response.is_success() {
            return Err(NotifyError::Status {
                status: response.status,
                body: response.body,
            });
        }

        let body: Value = serde_json::from_str(&response.body).unwrap_or(Value::Null);
        if body.get("ok").and_then(Value::as_bool) == Some(false) {
            let description = body
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown reason");
            return Err(NotifyError::Rejected(description.to_owned()));
        }
        tracing::info!(chat = %self.chat_id, chars = message.chars().count(), "telegram notification sent");
        Ok(())
    }
}

/// Writes reports to the log; used when no chat bot is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        tracing::info!(report = %message, "cycle report");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub min_rating: f64,
    /// Minimum |full - prime| / full, in percent.
    pub price_change_percent: f64,
    pub coupon_percent: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            min_rating: 4.0,
            price_change_percent: 5.0,
            coupon_percent: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    LowRating {
        listing: ListingCode,
        rating: f64,
    },
    PriceGap {
        listing: ListingCode,
        full: Money,
        prime: Money,
        percent: f64,
    },
    LargeCoupon {
        listing: ListingCode,
        coupon: Percent,
    },
}

impl Display for Alert {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowRating { listing, rating } => {
                write!(f, "Low rating for {listing}: {rating:.1} stars")
            }
            Self::PriceGap {
                listing,
                full,
                prime,
                percent,
            } => write!(
                f,
                "Price gap for {listing}: full {full}, prime {prime} ({percent:.2}%)"
            ),
            Self::LargeCoupon { listing, coupon } => {
                write!(f, "Large coupon for {listing}: {coupon}")
            }
        }
    }
}

/// Threshold checks for one record. Missing attributes never alert.
pub fn alerts(record: &ProductRecord, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut found = Vec::new();
    let listing = &record.listing_id;

    if let Field::Found(rating) = record.rating {
        if rating < thresholds.min_rating {
            found.push(Alert::LowRating {
                listing: listing.clone(),
                rating,
            });
        }
    }

    if let (Field::Found(full), Field::Found(prime)) = (&record.full_price, &record.prime_price) {
        if full.amount > 0.0 && prime.amount > 0.0 {
            let percent = (full.amount - prime.amount).abs() / full.amount * 100.0;
            if percent >= thresholds.price_change_percent {
                found.push(Alert::PriceGap {
                    listing: listing.clone(),
                    full: *full,
                    prime: *prime,
                    percent,
                });
            }
        }
    }

    if let Field::Found(coupon) = record.coupon_percent {
        if coupon.value() >= thresholds.coupon_percent {
            found.push(Alert::LargeCoupon {
                listing: listing.clone(),
                coupon,
            });
        }
    }

    found
}

/// Plain-text report of every collected listing, followed by any alerts.
///
/// Values come straight from the records written to the grid.
pub fn summary(title: &str, group: &CompanyGroup, thresholds: &AlertThresholds) -> String {
    let mut text = format!("Report for {title}\n\n");
    let mut raised = Vec::new();

    for (company, records) in group.iter() {
        let _ = writeln!(text, "{company}:");
        for record in records {
            let _ = writeln!(text, " Listing: {}", record.listing_id);
            let _ = writeln!(text, " Price: {}", display(&record.full_price));
            let _ = writeln!(text, " Rating: {}", display(&record.rating));
            text.push('\n');
            raised.extend(alerts(record, thresholds));
        }
    }

    if !raised.is_empty() {
        text.push_str("Alerts:\n");
        for alert in &raised {
            let _ = writeln!(text, " {alert}");
        }
    }
    text
}

fn display<T: Display>(field: &Field<T>) -> String {
    match field {
        Field::Found(value) => value.to_string(),
        Field::NotFound => MISSING.to_owned(),
    }
}
