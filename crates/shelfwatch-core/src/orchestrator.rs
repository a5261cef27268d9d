//! One Running phase: every report target is collected, normalized,
//! published to its grid and summarized, one target after another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::build_provider;
use crate::config::{ConfigSource, MonitorConfig, ReportTarget, MAIN_CONFIG_SHEET};
use crate::domain::{CompanyGroup, ProductRecord};
use crate::grid::GridSynchronizer;
use crate::http_client::HttpClient;
use crate::normalize::AttributeNormalizer;
use crate::notify::{summary, LogNotifier, Notifier, TelegramNotifier};
use crate::provider::{fetch_available, ScrapeProvider, ScrapeRequest};
use crate::provider_policy::ProviderPolicy;
use crate::scheduler::{Clock, CycleRunner};
use crate::throttling::RateLimiter;
use crate::{CoreError, ProviderId, ValidationError};

/// Resolves the scrape provider a target configuration asks for.
pub trait ProviderFactory: Send + Sync {
    fn provider(&self, config: &MonitorConfig) -> Result<Arc<dyn ScrapeProvider>, ValidationError>;
}

/// Builds adapters from configured credentials. Every adapter for the same
/// provider shares one limiter, so all targets draw from one request budget.
pub struct ConfiguredProviders {
    http_client: Arc<dyn HttpClient>,
    limiters: Mutex<HashMap<ProviderId, Arc<RateLimiter>>>,
}

impl ConfiguredProviders {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            limiters: Mutex::new(HashMap::new()),
        }
    }

    fn limiter(&self, provider: ProviderId) -> Arc<RateLimiter> {
        let mut limiters = self.limiters.lock().unwrap_or_else(PoisonError::into_inner);
        limiters
            .entry(provider)
            .or_insert_with(|| {
                Arc::new(RateLimiter::from_policy(&ProviderPolicy::default_for(provider)))
            })
            .clone()
    }
}

impl ProviderFactory for ConfiguredProviders {
    fn provider(&self, config: &MonitorConfig) -> Result<Arc<dyn ScrapeProvider>, ValidationError> {
        build_provider(
            config.provider,
            config.provider_credentials()?,
            self.http_client.clone(),
            self.limiter(config.provider),
        )
    }
}

/// Outcome of one report target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub data_sheet: String,
    pub records: usize,
    pub synced: bool,
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub targets: Vec<TargetReport>,
    /// Targets that failed before publishing.
    pub failed_targets: Vec<String>,
}

pub struct Orchestrator {
    config_source: Arc<dyn ConfigSource>,
    providers: Arc<dyn ProviderFactory>,
    synchronizer: GridSynchronizer,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    normalizer: AttributeNormalizer,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Orchestrator {
    pub fn new(
        config_source: Arc<dyn ConfigSource>,
        providers: Arc<dyn ProviderFactory>,
        synchronizer: GridSynchronizer,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config_source,
            providers,
            synchronizer,
            http_client,
            clock,
            normalizer: AttributeNormalizer::new(),
            notifier: None,
        }
    }

    /// Uses `notifier` for every target instead of the configured channel.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Loads the main config and every target overlay with full validation.
    /// Run before the first cycle so a bad setting stops startup instead of
    /// a live cycle. A target sheet that cannot be loaded is only logged,
    /// as a cycle would skip it.
    pub async fn validate(&self) -> Result<MonitorConfig, CoreError> {
        let main = MonitorConfig::from_values(self.config_source.load(MAIN_CONFIG_SHEET).await?)?;
        for target in &main.targets {
            let overlay = match self.config_source.load(&target.config_sheet).await {
                Ok(overlay) => overlay,
                Err(error) => {
                    tracing::warn!(
                        sheet = %target.config_sheet,
                        %error,
                        "target config not loaded"
                    );
                    continue;
                }
            };
            MonitorConfig::from_values(main.values().layered(&overlay))?;
        }
        Ok(main)
    }

    /// Runs every configured target once. Only a main config that cannot be
    /// loaded or names no target fails the cycle. Slot labels edited into
    /// an unparsable form since startup are dropped, not fatal.
    #[tracing::instrument(level = "info", skip(self), fields(cycle_id = tracing::field::Empty))]
    pub async fn run_once(&self, started_at: DateTime<Utc>) -> Result<CycleReport, CoreError> {
        let cycle_id = Uuid::new_v4();
        tracing::Span::current().record("cycle_id", tracing::field::display(cycle_id));

        let main = MonitorConfig::reloaded(self.config_source.load(MAIN_CONFIG_SHEET).await?)?;
        if main.targets.is_empty() {
            return Err(ValidationError::MissingConfigKey {
                key: String::from("Config_1"),
            }
            .into());
        }

        let mut report = CycleReport {
            cycle_id,
            targets: Vec::with_capacity(main.targets.len()),
            failed_targets: Vec::new(),
        };
        for target in &main.targets {
            match self.run_target(&main, target).await {
                Ok(outcome) => {
                    tracing::info!(
                        sheet = %outcome.data_sheet,
                        records = outcome.records,
                        synced = outcome.synced,
                        notified = outcome.notified,
                        "target processed"
                    );
                    report.targets.push(outcome);
                }
                Err(error) => {
                    tracing::error!(sheet = %target.data_sheet, %error, "target failed");
                    report.failed_targets.push(target.data_sheet.clone());
                }
            }
        }
        Ok(report)
    }

    async fn run_target(
        &self,
        main: &MonitorConfig,
        target: &ReportTarget,
    ) -> Result<TargetReport, CoreError> {
        let overlay = self.config_source.load(&target.config_sheet).await?;
        let config = MonitorConfig::reloaded(main.values().layered(&overlay))?;
        let provider = self.providers.provider(&config)?;

        let group = self.collect(&config, provider.as_ref()).await;
        let now = self.clock.now().with_timezone(&config.timezone);

        let grid = config.grid_config(&target.data_sheet);
        let synced = match self.synchronizer.synchronize(&grid, &group, now).await {
            Ok(_) => true,
            Err(error) => {
                tracing::error!(sheet = %target.data_sheet, %error, "grid update abandoned");
                false
            }
        };

        let notified = if group.is_empty() {
            false
        } else {
            let text = summary(
                &now.format("%Y-%m-%d %H:%M:%S").to_string(),
                &group,
                &config.thresholds,
            );
            match self.notifier_for(&config).send(&text).await {
                Ok(()) => true,
                Err(error) => {
                    tracing::error!(%error, "notification failed");
                    false
                }
            }
        };

        Ok(TargetReport {
            data_sheet: target.data_sheet.clone(),
            records: group.record_count(),
            synced,
            notified,
        })
    }

    /// Tracked company first (parent URLs, then variation URLs), then
    /// competitors by index. Unavailable listings are skipped.
    async fn collect(&self, config: &MonitorConfig, provider: &dyn ScrapeProvider) -> CompanyGroup {
        let mut group = CompanyGroup::new();
        let companies = std::iter::once((
            config.company_name.as_str(),
            &config.product_urls,
            &config.variation_urls,
        ))
        .chain(
            config
                .competitors
                .iter()
                .map(|c| (c.name.as_str(), &c.urls, &c.variation_urls)),
        );

        for (company, urls, variation_urls) in companies {
            group.ensure_company(company);
            tracing::info!(
                company,
                parents = urls.len(),
                variations = variation_urls.len(),
                "collecting listings"
            );
            for url in urls.iter().chain(variation_urls) {
                if let Some(record) = self.fetch_record(provider, url).await {
                    group.push(company, record);
                }
            }
        }
        group
    }

    async fn fetch_record(&self, provider: &dyn ScrapeProvider, url: &str) -> Option<ProductRecord> {
        let request = match ScrapeRequest::from_url(url) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(url, %error, "listing skipped");
                return None;
            }
        };
        let raw = fetch_available(provider, &request).await?;
        Some(self.normalizer.normalize(
            request.listing,
            &request.url,
            &request.market,
            &raw,
            self.clock.now(),
        ))
    }

    fn notifier_for(&self, config: &MonitorConfig) -> Arc<dyn Notifier> {
        if let Some(notifier) = &self.notifier {
            return notifier.clone();
        }
        match &config.telegram {
            Some(telegram) => Arc::new(TelegramNotifier::new(
                self.http_client.clone(),
                telegram.bot_token.clone(),
                telegram.chat_id.clone(),
            )),
            None => {
                tracing::warn!("telegram is not configured, report goes to the log");
                Arc::new(LogNotifier)
            }
        }
    }
}

#[async_trait]
impl CycleRunner for Orchestrator {
    async fn run_cycle(&self, started_at: DateTime<Utc>) -> Result<(), CoreError> {
        let report = self.run_once(started_at).await?;
        tracing::info!(
            cycle_id = %report.cycle_id,
            targets = report.targets.len(),
            failed = report.failed_targets.len(),
            "cycle complete"
        );
        Ok(())
    }
}
