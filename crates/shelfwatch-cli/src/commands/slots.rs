use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use shelfwatch_core::{nearest_slot, ConfigSource, MonitorConfig, TimeSlot, MAIN_CONFIG_SHEET};

use super::Wiring;
use crate::cli::{Cli, SlotsArgs};
use crate::error::CliError;

pub async fn execute(cli: &Cli, args: &SlotsArgs) -> Result<Value, CliError> {
    let at = parse_instant(args.at.as_deref())?;

    let wiring = Wiring::from_cli(cli)?;
    let main = MonitorConfig::from_values(wiring.config_source.load(MAIN_CONFIG_SHEET).await?)?;
    let schedule = main.schedule()?;

    let local = schedule.local(at);
    let next = schedule.local(schedule.next_wake(at));
    let grid_slots: Vec<TimeSlot> = main
        .active_slots
        .iter()
        .chain(&main.analysis_slots)
        .copied()
        .collect();

    Ok(json!({
        "timezone": main.timezone.name(),
        "at": local.to_rfc3339(),
        "wake_slots": labels(schedule.slots()),
        "active_slots": labels(&main.active_slots),
        "analysis_slots": labels(&main.analysis_slots),
        "update_slot": main.update_slot.label(),
        "next_wake": next.to_rfc3339(),
        "nearest_column": nearest_slot(local.time(), &grid_slots).map(TimeSlot::label),
    }))
}

fn parse_instant(at: Option<&str>) -> Result<DateTime<Utc>, CliError> {
    match at {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|instant| instant.with_timezone(&Utc))
            .map_err(|error| CliError::Command(format!("invalid --at '{raw}': {error}"))),
    }
}

fn labels(slots: &[TimeSlot]) -> Vec<String> {
    slots.iter().map(|slot| slot.label()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offset_instants_to_utc() {
        let at = parse_instant(Some("2024-05-10T13:59:00+03:00")).expect("valid instant");
        assert_eq!(at.to_rfc3339(), "2024-05-10T10:59:00+00:00");
    }

    #[test]
    fn rejects_garbage_instants() {
        let error = parse_instant(Some("tomorrow")).expect_err("invalid instant");
        assert_eq!(error.exit_code(), 2);
    }
}
