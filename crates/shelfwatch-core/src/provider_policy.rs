use std::time::Duration;

use crate::retry::{Backoff, RetryConfig};
use crate::ProviderId;

/// Per-provider request budget and retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub timeout_ms: u64,
    pub retry: RetryConfig,
}

impl ProviderPolicy {
    /// One request per second, 30 s timeout, three retries starting at 2 s.
    pub fn standard(provider_id: ProviderId) -> Self {
        Self {
            provider_id,
            quota_window: Duration::from_secs(1),
            quota_limit: 1,
            timeout_ms: 30_000,
            retry: RetryConfig {
                max_retries: 3,
                backoff: Backoff::Exponential {
                    base: Duration::from_secs(2),
                    factor: 2.0,
                    max: Duration::from_secs(30),
                    jitter: false,
                },
                ..RetryConfig::default()
            },
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::ScraperApi | ProviderId::ScrapingDog => Self::standard(provider_id),
            // Realtime queries render pages server-side and answer slower.
            ProviderId::Oxylabs => Self {
                timeout_ms: 60_000,
                ..Self::standard(provider_id)
            },
        }
    }
}
