mod normalize;
mod once;
mod run;
mod slots;

use std::sync::Arc;

use serde_json::Value;
use shelfwatch_core::{
    Clock, ConfigSource, ConfiguredProviders, FileConfigSource, GoogleSheetsBackend,
    GridSynchronizer, HttpClient, Orchestrator, ReqwestHttpClient, SheetConfigSource,
    SheetsBackend,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Dispatches the parsed command and returns its JSON output.
pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    match &cli.command {
        Command::Run => run::execute(cli).await,
        Command::Once => once::execute(cli).await,
        Command::Slots(args) => slots::execute(cli, args).await,
        Command::Normalize(args) => normalize::execute(args).await,
    }
}

/// Shared wiring for commands that talk to the spreadsheet.
struct Wiring {
    http_client: Arc<dyn HttpClient>,
    config_source: Arc<dyn ConfigSource>,
    backend: Arc<dyn SheetsBackend>,
    spreadsheet_id: String,
}

impl Wiring {
    fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

        let spreadsheet_id = cli.spreadsheet_id.clone().unwrap_or_default();
        let token = cli.access_token.clone().unwrap_or_default();
        let backend: Arc<dyn SheetsBackend> =
            Arc::new(GoogleSheetsBackend::new(http_client.clone(), token));

        let config_source: Arc<dyn ConfigSource> = match &cli.config_file {
            Some(path) => Arc::new(FileConfigSource::new(path.clone())),
            None => {
                if spreadsheet_id.is_empty() {
                    return Err(CliError::Command(String::from(
                        "either --config-file or --spreadsheet-id is required",
                    )));
                }
                Arc::new(SheetConfigSource::new(backend.clone(), spreadsheet_id.clone()))
            }
        };

        Ok(Self {
            http_client,
            config_source,
            backend,
            spreadsheet_id,
        })
    }

    fn require_spreadsheet(&self) -> Result<(), CliError> {
        if self.spreadsheet_id.is_empty() {
            return Err(CliError::Command(String::from(
                "--spreadsheet-id is required to publish report grids",
            )));
        }
        Ok(())
    }

    fn orchestrator(&self, clock: Arc<dyn Clock>) -> Orchestrator {
        Orchestrator::new(
            self.config_source.clone(),
            Arc::new(ConfiguredProviders::new(self.http_client.clone())),
            GridSynchronizer::new(self.backend.clone(), self.spreadsheet_id.clone()),
            self.http_client.clone(),
            clock,
        )
    }
}
