//! Slot arithmetic and the run/sleep control loop.
//!
//! The loop fires one cycle immediately, then sleeps until the next
//! configured slot. A failed cycle backs off for a fixed interval instead of
//! waiting for the next slot. Cancellation is cooperative: a running cycle
//! completes before the loop observes the token.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::TimeSlot;
use crate::{CoreError, ValidationError};

/// Backoff after a failed cycle.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Parses an IANA timezone name such as `Europe/Kyiv`.
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ValidationError::InvalidTimezone {
            value: name.to_owned(),
        })
}

/// Earliest slot strictly after `now` on the same local day, else the first
/// slot of the following day. `None` only for an empty slot list.
pub fn next_slot(now: DateTime<Tz>, slots: &[TimeSlot]) -> Option<DateTime<Tz>> {
    let mut sorted = slots.to_vec();
    sorted.sort();
    let first = *sorted.first()?;
    let today = now.date_naive();
    let now_time = now.time();

    match sorted.iter().find(|slot| slot.time() > now_time) {
        Some(slot) => localize(now.timezone(), today, slot.time()),
        None => {
            let tomorrow = today.checked_add_days(Days::new(1))?;
            localize(now.timezone(), tomorrow, first.time())
        }
    }
}

/// Slot whose time of day is closest to `now` in either direction, within
/// the same day. Ties go to the earlier slot.
pub fn nearest_slot(now: NaiveTime, slots: &[TimeSlot]) -> Option<TimeSlot> {
    let now_seconds = i64::from(now.num_seconds_from_midnight());
    slots
        .iter()
        .copied()
        .min_by_key(|slot| ((slot.seconds_of_day() - now_seconds).abs(), *slot))
}

/// Resolves a local wall-clock time, stepping past a DST gap when the time
/// does not exist on that day.
fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    let local = date.and_time(time);
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + TimeDelta::hours(1))).earliest())
}

/// Ordered, de-duplicated wake slots in one timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSchedule {
    slots: Vec<TimeSlot>,
    timezone: Tz,
}

impl SlotSchedule {
    pub fn new(mut slots: Vec<TimeSlot>, timezone: Tz) -> Result<Self, ValidationError> {
        slots.sort();
        slots.dedup();
        if slots.is_empty() {
            return Err(ValidationError::EmptySlots);
        }
        Ok(Self { slots, timezone })
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.timezone)
    }

    /// Next wake instant strictly after `now`.
    pub fn next_wake(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        next_slot(self.local(now), &self.slots)
            .map(|wake| wake.with_timezone(&Utc))
            .unwrap_or(now + TimeDelta::days(1))
    }

    pub fn nearest(&self, now: DateTime<Utc>) -> Option<TimeSlot> {
        nearest_slot(self.local(now).time(), &self.slots)
    }
}

/// Wall clock plus the ability to wait, so loops can run on simulated time.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let remaining = (deadline - self.now()).to_std().unwrap_or(Duration::ZERO);
        self.sleep(remaining).await;
    }
}

/// The host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock anchored at a fixed wall time that advances with the tokio timer,
/// so a paused runtime drives it deterministically.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor: DateTime<Utc>,
    started: Instant,
}

impl MonotonicClock {
    pub fn starting_at(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::MAX);
        self.anchor + elapsed
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// One full collect-normalize-publish pass over every report target.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self, started_at: DateTime<Utc>) -> Result<(), CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle { wake_at: DateTime<Utc> },
    Running,
    Stopped,
}

/// Totals reported when the loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerReport {
    pub cycles: u32,
    pub failures: u32,
}

pub struct SlotScheduler {
    schedule: SlotSchedule,
    clock: Arc<dyn Clock>,
    error_backoff: Duration,
    state: Mutex<SchedulerState>,
}

impl SlotScheduler {
    pub fn new(schedule: SlotSchedule, clock: Arc<dyn Clock>) -> Self {
        Self {
            schedule,
            clock,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            state: Mutex::new(SchedulerState::Stopped),
        }
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn schedule(&self) -> &SlotSchedule {
        &self.schedule
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: SchedulerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Drives cycles until `cancel` fires. Cycle errors never end the loop.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn run(&self, runner: &dyn CycleRunner, cancel: CancellationToken) -> SchedulerReport {
        let mut report = SchedulerReport::default();

        while !cancel.is_cancelled() {
            self.transition(SchedulerState::Running);
            let started_at = self.clock.now();
            tracing::info!(%started_at, "cycle started");

            let outcome = runner.run_cycle(started_at).await;
            report.cycles += 1;

            let wake_at = match outcome {
                Ok(()) => {
                    let wake_at = self.schedule.next_wake(self.clock.now());
                    tracing::info!(
                        next = %self.schedule.local(wake_at).format("%Y-%m-%d %H:%M %Z"),
                        "cycle finished"
                    );
                    wake_at
                }
                Err(error) => {
                    report.failures += 1;
                    tracing::error!(
                        %error,
                        backoff_secs = self.error_backoff.as_secs(),
                        "cycle failed, backing off"
                    );
                    self.clock.now()
                        + TimeDelta::from_std(self.error_backoff).unwrap_or(TimeDelta::minutes(1))
                }
            };

            self.transition(SchedulerState::Idle { wake_at });
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.clock.sleep_until(wake_at) => {}
            }
        }

        self.transition(SchedulerState::Stopped);
        tracing::info!(cycles = report.cycles, failures = report.failures, "scheduler stopped");
        report
    }
}
