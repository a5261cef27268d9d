use thiserror::Error;

/// Validation and contract errors exposed by `shelfwatch-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("time slot '{value}' must be HH:MM in 24-hour format")]
    InvalidSlot { value: String },
    #[error("at least one time slot must be configured")]
    EmptySlots,

    #[error("unknown IANA timezone '{value}'")]
    InvalidTimezone { value: String },

    #[error("invalid provider '{value}', expected one of scraperapi, scrapingdog, oxylabs")]
    InvalidProvider { value: String },

    #[error("listing code must be 10 uppercase alphanumeric characters: '{value}'")]
    InvalidListingCode { value: String },

    #[error("url '{value}' is not an absolute http(s) url")]
    InvalidUrl { value: String },

    #[error("config key '{key}' is required")]
    MissingConfigKey { key: String },

    #[error("at most {max} competitors are supported, got index {index}")]
    CompetitorOutOfRange { index: usize, max: usize },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sheets(#[from] crate::sheets::SheetsError),

    #[error(transparent)]
    Notify(#[from] crate::notify::NotifyError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
