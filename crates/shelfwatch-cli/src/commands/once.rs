use std::sync::Arc;

use serde_json::Value;
use shelfwatch_core::{Clock, SystemClock};

use super::Wiring;
use crate::cli::Cli;
use crate::error::CliError;

pub async fn execute(cli: &Cli) -> Result<Value, CliError> {
    let wiring = Wiring::from_cli(cli)?;
    wiring.require_spreadsheet()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let orchestrator = wiring.orchestrator(clock.clone());
    let report = orchestrator.run_once(clock.now()).await?;

    Ok(serde_json::to_value(report)?)
}
