//! Key/value monitor configuration.
//!
//! Configuration arrives as `Key`/`Value` rows, either from a sheet of the
//! report spreadsheet or from a local JSON file. Each report target has its
//! own sheet whose rows are layered over the main `Config` sheet.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::ProviderCredentials;
use crate::domain::TimeSlot;
use crate::grid::{a1, CompanySection, GridConfig};
use crate::notify::AlertThresholds;
use crate::scheduler::{parse_timezone, SlotSchedule};
use crate::sheets::{SheetsBackend, SheetsError};
use crate::{CoreError, ProviderId, ValidationError};

pub const MAIN_CONFIG_SHEET: &str = "Config";
pub const DEFAULT_COMPANY_NAME: &str = "Tracked company";
pub const DEFAULT_TIMEZONE: &str = "Europe/Kyiv";
pub const DEFAULT_PROVIDER: ProviderId = ProviderId::ScrapingDog;
pub const MAX_COMPETITORS: usize = 5;
/// `Config_1`..`Config_9`.
pub const MAX_TARGETS: usize = 9;

static COMPETITOR_NAME_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^competitor_(\d+)_name$").expect("competitor key pattern is valid")
});
static URL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n,]+").expect("url separator pattern is valid"));
static SLOT_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("slot separator pattern is valid"));

/// Raw configuration rows keyed by trimmed key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigValues(BTreeMap<String, String>);

impl ConfigValues {
    /// Builds values from sheet rows. A leading `Key`/`Value` header row is
    /// skipped, rows with a blank key are ignored, and surrounding quotes are
    /// stripped from values.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut values = BTreeMap::new();
        for (index, row) in rows.iter().enumerate() {
            let key = row.first().map(|key| key.trim()).unwrap_or_default();
            if index == 0 && key.eq_ignore_ascii_case("key") {
                continue;
            }
            if key.is_empty() {
                if row.iter().any(|cell| !cell.trim().is_empty()) {
                    tracing::warn!(row = index + 1, "config row with empty key skipped");
                }
                continue;
            }
            let value = row.get(1).map(|value| unquote(value)).unwrap_or_default();
            values.insert(key.to_owned(), value.to_owned());
        }
        Self(values)
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.trim().to_owned(), unquote(value).to_owned()))
                .collect(),
        )
    }

    /// Non-blank value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// `self` overlaid with `overlay`; overlay keys win.
    pub fn layered(&self, overlay: &Self) -> Self {
        let mut merged = self.0.clone();
        merged.extend(overlay.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorConfig {
    /// 1-based competitor index.
    pub index: usize,
    pub name: String,
    pub urls: Vec<String>,
    pub variation_urls: Vec<String>,
}

/// A per-target config sheet and the data sheet it publishes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTarget {
    pub config_sheet: String,
    pub data_sheet: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

/// Typed view of one (possibly layered) configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub company_name: String,
    pub product_urls: Vec<String>,
    pub variation_urls: Vec<String>,
    pub competitors: Vec<CompetitorConfig>,
    pub active_slots: Vec<TimeSlot>,
    pub analysis_slots: Vec<TimeSlot>,
    /// From `update_time_hour`/`update_time_minute`; wakes the scheduler but
    /// has no grid column.
    pub update_slot: TimeSlot,
    pub timezone: Tz,
    pub provider: ProviderId,
    pub telegram: Option<TelegramSettings>,
    pub thresholds: AlertThresholds,
    pub targets: Vec<ReportTarget>,
    values: ConfigValues,
}

/// How slot lists treat labels that do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotParsing {
    Strict,
    SkipInvalid,
}

impl MonitorConfig {
    /// Validates every setting. An unparsable slot label is an error.
    pub fn from_values(values: ConfigValues) -> Result<Self, ValidationError> {
        Self::build(values, SlotParsing::Strict)
    }

    /// Reads settings re-loaded while the monitor runs. Slot labels that no
    /// longer parse are logged and dropped; every other setting is validated
    /// as in [`MonitorConfig::from_values`].
    pub fn reloaded(values: ConfigValues) -> Result<Self, ValidationError> {
        Self::build(values, SlotParsing::SkipInvalid)
    }

    fn build(values: ConfigValues, slot_parsing: SlotParsing) -> Result<Self, ValidationError> {
        let company_name = values
            .get("company_name")
            .map(str::trim)
            .unwrap_or(DEFAULT_COMPANY_NAME)
            .to_owned();

        let timezone = parse_timezone(values.get("timezone").unwrap_or(DEFAULT_TIMEZONE))?;
        let provider = match values.get("provider") {
            Some(name) => name.parse()?,
            None => DEFAULT_PROVIDER,
        };

        let update_slot = TimeSlot::from_hm(
            integer(&values, "update_time_hour"),
            integer(&values, "update_time_minute"),
        )?;

        let defaults = AlertThresholds::default();
        let thresholds = AlertThresholds {
            min_rating: float(&values, "min_acceptable_rating", defaults.min_rating),
            price_change_percent: float(
                &values,
                "price_change_threshold",
                defaults.price_change_percent,
            ),
            coupon_percent: float(&values, "coupon_threshold", defaults.coupon_percent),
        };

        let telegram = match (values.get("telegram_bot_token"), values.get("telegram_chat_id")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramSettings {
                bot_token: bot_token.trim().to_owned(),
                chat_id: chat_id.trim().to_owned(),
            }),
            _ => None,
        };

        let config = Self {
            company_name,
            product_urls: urls(&values, "product_urls")?,
            variation_urls: urls(&values, "variation_urls")?,
            competitors: competitors(&values)?,
            active_slots: slots(&values, "active_trade_slots", slot_parsing)?,
            analysis_slots: slots(&values, "analysis_slots", slot_parsing)?,
            update_slot,
            timezone,
            provider,
            telegram,
            thresholds,
            targets: targets(&values),
            values,
        };

        tracing::debug!(
            company = %config.company_name,
            competitors = config.competitors.len(),
            provider = %config.provider,
            targets = config.targets.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn values(&self) -> &ConfigValues {
        &self.values
    }

    /// Active, analysis and update slots, sorted and de-duplicated.
    pub fn wake_slots(&self) -> Vec<TimeSlot> {
        let mut all: Vec<TimeSlot> = self
            .active_slots
            .iter()
            .chain(&self.analysis_slots)
            .copied()
            .chain(std::iter::once(self.update_slot))
            .collect();
        all.sort();
        all.dedup();
        all
    }

    pub fn schedule(&self) -> Result<SlotSchedule, ValidationError> {
        SlotSchedule::new(self.wake_slots(), self.timezone)
    }

    /// Grid layout inputs for `sheet_name`: tracked company first, then
    /// competitors by index.
    pub fn grid_config(&self, sheet_name: &str) -> GridConfig {
        let mut parent_sections = vec![CompanySection::new(
            self.company_name.clone(),
            self.product_urls.clone(),
        )];
        let mut variation_sections = vec![CompanySection::new(
            self.company_name.clone(),
            self.variation_urls.clone(),
        )];
        for competitor in &self.competitors {
            parent_sections.push(CompanySection::new(
                competitor.name.clone(),
                competitor.urls.clone(),
            ));
            variation_sections.push(CompanySection::new(
                competitor.name.clone(),
                competitor.variation_urls.clone(),
            ));
        }

        GridConfig {
            sheet_name: sheet_name.to_owned(),
            active_slots: self.active_slots.clone(),
            analysis_slots: self.analysis_slots.clone(),
            parent_sections,
            variation_sections,
        }
    }

    /// Credentials for the selected provider.
    pub fn provider_credentials(&self) -> Result<ProviderCredentials, ValidationError> {
        let required = |key: &str| {
            self.values
                .get(key)
                .map(|value| value.trim().to_owned())
                .ok_or_else(|| ValidationError::MissingConfigKey {
                    key: key.to_owned(),
                })
        };
        match self.provider {
            ProviderId::ScraperApi => required("ScraperAPI").map(ProviderCredentials::ApiKey),
            ProviderId::ScrapingDog => {
                required("ScrapingDogAPIKey").map(ProviderCredentials::ApiKey)
            }
            ProviderId::Oxylabs => Ok(ProviderCredentials::Basic {
                username: required("oxylabs_username")?,
                password: required("oxylabs_password")?,
            }),
        }
    }
}

/// Integer setting; malformed values fall back to 0.
fn integer(values: &ConfigValues, key: &str) -> u32 {
    match values.get(key) {
        None => 0,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::error!(key, value = raw, "malformed integer setting, using 0");
            0
        }),
    }
}

/// Float setting; a missing key takes `default`, a malformed value falls
/// back to 0.
fn float(values: &ConfigValues, key: &str, default: f64) -> f64 {
    match values.get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::error!(key, value = raw, "malformed number setting, using 0");
            0.0
        }),
    }
}

fn urls(values: &ConfigValues, key: &str) -> Result<Vec<String>, ValidationError> {
    let Some(raw) = values.get(key) else {
        return Ok(Vec::new());
    };
    URL_SEPARATOR
        .split(raw)
        .map(unquote)
        .filter(|url| !url.is_empty())
        .map(|url| {
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_owned())
            } else {
                Err(ValidationError::InvalidUrl {
                    value: url.to_owned(),
                })
            }
        })
        .collect()
}

fn slots(
    values: &ConfigValues,
    key: &str,
    parsing: SlotParsing,
) -> Result<Vec<TimeSlot>, ValidationError> {
    let Some(raw) = values.get(key) else {
        return Ok(Vec::new());
    };
    let labels = SLOT_SEPARATOR
        .split(raw.trim())
        .filter(|label| !label.is_empty());
    let mut parsed = match parsing {
        SlotParsing::Strict => labels.map(TimeSlot::parse).collect::<Result<Vec<_>, _>>()?,
        SlotParsing::SkipInvalid => labels
            .filter_map(|label| match TimeSlot::parse(label) {
                Ok(slot) => Some(slot),
                Err(error) => {
                    tracing::warn!(key, %error, "unparsable slot dropped");
                    None
                }
            })
            .collect(),
    };
    parsed.sort();
    parsed.dedup();
    Ok(parsed)
}

fn competitors(values: &ConfigValues) -> Result<Vec<CompetitorConfig>, ValidationError> {
    for key in values.keys() {
        let index = COMPETITOR_NAME_KEY
            .captures(key)
            .and_then(|captures| captures[1].parse::<usize>().ok());
        if let Some(index) = index {
            if (index == 0 || index > MAX_COMPETITORS) && values.get(key).is_some() {
                return Err(ValidationError::CompetitorOutOfRange {
                    index,
                    max: MAX_COMPETITORS,
                });
            }
        }
    }

    (1..=MAX_COMPETITORS)
        .filter_map(|index| {
            let name = values.get(&format!("competitor_{index}_name"))?.trim().to_owned();
            Some((index, name))
        })
        .map(|(index, name)| {
            Ok(CompetitorConfig {
                index,
                name,
                urls: urls(values, &format!("{index}competitor_urls"))?,
                variation_urls: urls(values, &format!("{index}variation_urls"))?,
            })
        })
        .collect()
}

fn targets(values: &ConfigValues) -> Vec<ReportTarget> {
    (1..=MAX_TARGETS)
        .filter_map(|index| {
            let config_sheet = values.get(&format!("Config_{index}"))?;
            let data_sheet = values.get(&format!("Name list_{index}"))?;
            Some(ReportTarget {
                config_sheet: config_sheet.trim().to_owned(),
                data_sheet: data_sheet.trim().to_owned(),
            })
        })
        .collect()
}

/// Where configuration rows come from.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self, sheet: &str) -> Result<ConfigValues, CoreError>;
}

/// Reads `<sheet>!A:B` of the report spreadsheet.
pub struct SheetConfigSource {
    backend: Arc<dyn SheetsBackend>,
    spreadsheet_id: String,
}

impl SheetConfigSource {
    pub fn new(backend: Arc<dyn SheetsBackend>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            backend,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }
}

#[async_trait]
impl ConfigSource for SheetConfigSource {
    async fn load(&self, sheet: &str) -> Result<ConfigValues, CoreError> {
        let rows = self
            .backend
            .read_values(&self.spreadsheet_id, &a1::columns(sheet, 1, 2))
            .await?;
        let values = ConfigValues::from_rows(&rows);
        tracing::info!(sheet, keys = values.len(), "config sheet loaded");
        Ok(values)
    }
}

/// JSON file mapping sheet name to an object of settings, for running
/// without spreadsheet access to the config sheets.
///
/// ```json
/// { "Config": { "timezone": "Europe/Kyiv", "Config_1": "Socks", "Name list_1": "Socks data" },
///   "Socks": { "product_urls": ["https://www.amazon.de/dp/B000000001"] } }
/// ```
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self, sheet: &str) -> Result<ConfigValues, CoreError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let document: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(&text)?;
        let settings = document.get(sheet).ok_or_else(|| SheetsError::SheetNotFound {
            title: sheet.to_owned(),
        })?;

        let values = settings
            .iter()
            .map(|(key, value)| (key.trim().to_owned(), setting_text(value)))
            .collect();
        tracing::info!(sheet, path = %self.path.display(), "config loaded from file");
        Ok(ConfigValues(values))
    }
}

/// Lists join with newlines so URL and slot splitting apply unchanged.
fn setting_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(setting_text)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}
