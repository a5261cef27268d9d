use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] shelfwatch_core::ValidationError),

    #[error(transparent)]
    Core(#[from] shelfwatch_core::CoreError),

    #[error(transparent)]
    Source(#[from] shelfwatch_core::SourceError),

    #[error("command error: {0}")]
    Command(String),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Source(_) => 3,
            Self::Core(_) => 3,
            Self::Serialization(_) => 4,
            Self::Logging(_) => 5,
            Self::Io(_) => 10,
        }
    }
}
