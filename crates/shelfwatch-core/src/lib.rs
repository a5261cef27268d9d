//! # Shelfwatch Core
//!
//! Listing collection, attribute normalization, slot scheduling and grid
//! synchronization for the Shelfwatch marketplace monitor.
//!
//! ## Overview
//!
//! - **Provider adapters** fetch raw listing payloads from ScraperAPI,
//!   ScrapingDog or Oxylabs behind one [`ScrapeProvider`] trait
//! - **Attribute normalization** turns provider payloads into canonical
//!   [`ProductRecord`]s with explicit [`Field::NotFound`] markers
//! - **Rate limiting** bounds calls per provider inside a sliding window
//! - **Slot scheduling** wakes at configured `HH:MM` slots in one timezone
//! - **Grid synchronization** lays out the comparison grid and submits it
//!   as one batched write
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | ScraperAPI, ScrapingDog and Oxylabs adapters |
//! | [`config`] | Key/value configuration and its sources |
//! | [`domain`] | Listing codes, canonical records, slots |
//! | [`error`] | Core error types |
//! | [`grid`] | Grid layout, A1 addressing, batched synchronization |
//! | [`http_client`] | HTTP client abstraction |
//! | [`normalize`] | Price, coupon, rating, review and rank extraction |
//! | [`notify`] | Cycle summaries, alerts, chat delivery |
//! | [`orchestrator`] | One collect-normalize-publish pass over all targets |
//! | [`provider`] | Scrape-provider contract and errors |
//! | [`provider_policy`] | Per-provider quotas, timeouts and retries |
//! | [`retry`] | Retry and backoff |
//! | [`scheduler`] | Slot arithmetic and the run/sleep loop |
//! | [`sheets`] | Spreadsheet backend |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Sliding-window rate limiter |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shelfwatch_core::{AttributeNormalizer, MarketHint, RawListing, ScrapeRequest};
//!
//! let request = ScrapeRequest::from_url("https://www.amazon.de/dp/B0CXYZ1234")?;
//! let raw = provider.fetch(&request).await?;
//! let record = AttributeNormalizer::new().normalize(
//!     request.listing,
//!     &request.url,
//!     &request.market,
//!     &raw,
//!     chrono::Utc::now(),
//! );
//! println!("{}", serde_json::to_string_pretty(&record)?);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ SlotScheduler   │
//! └────────┬────────┘
//!          │ run_cycle
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Orchestrator   │────▶│ ConfigSource     │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ ScrapeProvider  │────▶│ RateLimiter +    │
//! │ (Adapter Trait) │     │ HttpClient       │
//! └────────┬────────┘     └──────────────────┘
//!          │ RawListing
//!          ▼
//! ┌─────────────────┐
//! │ Normalizer      │
//! └────────┬────────┘
//!          │ ProductRecord
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ GridSynchronizer│────▶│ SheetsBackend    │
//! └────────┬────────┘     └──────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Notifier        │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Provider failures carry a [`SourceErrorKind`]; an unavailable listing is
//! skipped and the cycle continues:
//!
//! ```rust
//! use shelfwatch_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited | SourceErrorKind::Unavailable => "transient",
//!         SourceErrorKind::NotFound => "listing gone",
//!         _ => "permanent",
//!     }
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod grid;
pub mod http_client;
pub mod normalize;
pub mod notify;
pub mod orchestrator;
pub mod provider;
pub mod provider_policy;
pub mod retry;
pub mod scheduler;
pub mod sheets;
pub mod source;
pub mod throttling;

// Adapter implementations
pub use adapters::{
    build_provider, parse_payload, OxylabsAdapter, ProviderCredentials, ScraperApiAdapter,
    ScrapingDogAdapter,
};

// Configuration
pub use config::{
    CompetitorConfig, ConfigSource, ConfigValues, FileConfigSource, MonitorConfig, ReportTarget,
    SheetConfigSource, TelegramSettings, MAIN_CONFIG_SHEET,
};

// Domain models
pub use domain::{
    parse_slots, BestSellerRank, CategoryRank, CompanyGroup, Currency, Field, ListingCode,
    MarketHint, Money, Percent, ProductRecord, RawAttributePayload, RawListing, TimeSlot,
};

// Error types
pub use error::{CoreError, ValidationError};

// Grid
pub use grid::{
    BatchUpdate, CellFormat, CellStyle, GridConfig, GridLayout, GridPlan, GridSynchronizer,
    GridValue, SyncReport, ValueRange,
};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Normalization
pub use normalize::AttributeNormalizer;

// Notifications
pub use notify::{Alert, AlertThresholds, LogNotifier, Notifier, NotifyError, TelegramNotifier};

// Orchestration
pub use orchestrator::{
    ConfiguredProviders, CycleReport, Orchestrator, ProviderFactory, TargetReport,
};

// Provider contract
pub use provider::{fetch_available, ScrapeProvider, ScrapeRequest, SourceError, SourceErrorKind};

// Provider policies
pub use provider_policy::ProviderPolicy;

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Scheduling
pub use scheduler::{
    next_slot, nearest_slot, parse_timezone, Clock, CycleRunner, MonotonicClock, SchedulerReport,
    SchedulerState, SlotSchedule, SlotScheduler, SystemClock,
};

// Spreadsheet backend
pub use sheets::{GoogleSheetsBackend, SheetsBackend, SheetsError};

// Source identifiers
pub use source::ProviderId;

// Throttling
pub use throttling::RateLimiter;
