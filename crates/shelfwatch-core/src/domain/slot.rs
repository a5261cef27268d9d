use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Wall-clock `HH:MM` slot. Ordering follows time of day, which matches the
/// lexicographic order of the zero-padded label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidSlot {
            value: trimmed.to_owned(),
        };

        let (hour, minute) = trimmed.split_once(':').ok_or_else(invalid)?;
        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(hour) || !two_digits(minute) {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(invalid)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidSlot {
                value: format!("{hour:02}:{minute:02}"),
            })
    }

    pub const fn time(self) -> NaiveTime {
        self.0
    }

    pub fn label(self) -> String {
        format!("{:02}:{:02}", self.0.hour(), self.0.minute())
    }

    /// Seconds since midnight.
    pub fn seconds_of_day(self) -> i64 {
        i64::from(self.0.num_seconds_from_midnight())
    }
}

impl Display for TimeSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for TimeSlot {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeSlot> for String {
    fn from(value: TimeSlot) -> Self {
        value.label()
    }
}

/// Parses, deduplicates and sorts slot labels. Any unparsable label fails
/// the whole set.
pub fn parse_slots<'a>(
    labels: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<TimeSlot>, ValidationError> {
    let mut slots = labels
        .into_iter()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(TimeSlot::parse)
        .collect::<Result<Vec<_>, _>>()?;
    slots.sort();
    slots.dedup();
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zero_padded_slots() {
        let slot = TimeSlot::parse("08:05").expect("valid slot");
        assert_eq!(slot.label(), "08:05");
        assert_eq!(slot.seconds_of_day(), 8 * 3600 + 5 * 60);
    }

    #[test]
    fn rejects_malformed_slots() {
        for bad in ["8:00", "+8:00", "08:+5", "24:00", "12:60", "noon", "12-00", ""] {
            assert!(TimeSlot::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn parse_slots_sorts_and_dedups() {
        let slots = parse_slots(["20:00", "08:00", "14:00", "08:00"]).expect("valid");
        let labels: Vec<String> = slots.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["08:00", "14:00", "20:00"]);
    }

    #[test]
    fn parse_slots_fails_on_any_bad_label() {
        assert!(parse_slots(["08:00", "25:00"]).is_err());
    }
}
