use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use shelfwatch_core::{Clock, SlotScheduler, SystemClock};
use tokio_util::sync::CancellationToken;

use super::Wiring;
use crate::cli::Cli;
use crate::error::CliError;

pub async fn execute(cli: &Cli) -> Result<Value, CliError> {
    let wiring = Wiring::from_cli(cli)?;
    wiring.require_spreadsheet()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let orchestrator = wiring.orchestrator(clock.clone());

    // Every target is validated once here. Slots and timezone are fixed for
    // the life of the process; target settings are reloaded by every cycle.
    let main = orchestrator.validate().await?;
    let schedule = main.schedule()?;
    tracing::info!(
        slots = ?schedule.slots().iter().map(|slot| slot.label()).collect::<Vec<_>>(),
        timezone = %main.timezone,
        targets = main.targets.len(),
        "scheduler configured"
    );

    let scheduler = SlotScheduler::new(schedule, clock);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, stopping after the current cycle");
                on_signal.cancel();
            }
            Err(error) => tracing::warn!(%error, "cannot listen for interrupts"),
        }
    });

    let report = scheduler.run(&orchestrator, cancel).await;
    Ok(serde_json::to_value(RunSummary {
        cycles: report.cycles,
        failures: report.failures,
    })?)
}

/// Printed once the loop stops.
#[derive(Debug, Serialize)]
struct RunSummary {
    cycles: u32,
    failures: u32,
}
