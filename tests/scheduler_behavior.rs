use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shelfwatch_core::{
    parse_slots, Clock, CoreError, CycleRunner, MonotonicClock, SchedulerState, SlotSchedule,
    SlotScheduler,
};
use tokio_util::sync::CancellationToken;

/// Records cycle start times, fails the first `failures` cycles and cancels
/// the loop once `stop_after` cycles have run.
struct RecordingRunner {
    started: Mutex<Vec<DateTime<Utc>>>,
    failures: AtomicU32,
    stop_after: usize,
    cycle_duration: Duration,
    cancel: CancellationToken,
}

impl RecordingRunner {
    fn new(stop_after: usize, cancel: CancellationToken) -> Self {
        Self {
            started: Mutex::new(Vec::new()),
            failures: AtomicU32::new(0),
            stop_after,
            cycle_duration: Duration::ZERO,
            cancel,
        }
    }

    fn failing_first(self, failures: u32) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    fn taking(mut self, cycle_duration: Duration) -> Self {
        self.cycle_duration = cycle_duration;
        self
    }

    fn started_minutes(&self) -> Vec<String> {
        self.started
            .lock()
            .expect("runner lock")
            .iter()
            .map(|at| at.format("%m-%d %H:%M").to_string())
            .collect()
    }
}

#[async_trait]
impl CycleRunner for RecordingRunner {
    async fn run_cycle(&self, started_at: DateTime<Utc>) -> Result<(), CoreError> {
        let count = {
            let mut started = self.started.lock().expect("runner lock");
            started.push(started_at);
            started.len()
        };
        if !self.cycle_duration.is_zero() {
            tokio::time::sleep(self.cycle_duration).await;
        }
        if count >= self.stop_after {
            self.cancel.cancel();
        }

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CoreError::Io(std::io::Error::other("config sheet unreachable")));
        }
        Ok(())
    }
}

fn utc(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

/// 08:00, 14:00 and 20:00 in Kyiv, which is UTC+3 in May.
fn kyiv_schedule() -> SlotSchedule {
    let slots = parse_slots(["20:00", "08:00", "14:00", "14:00"]).expect("valid slots");
    SlotSchedule::new(slots, chrono_tz::Europe::Kyiv).expect("schedule")
}

#[tokio::test(start_paused = true)]
async fn fires_immediately_then_at_each_slot() {
    let cancel = CancellationToken::new();
    let runner = RecordingRunner::new(4, cancel.clone());
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::starting_at(utc(10, 59)));
    let scheduler = SlotScheduler::new(kyiv_schedule(), clock);

    let report = scheduler.run(&runner, cancel).await;

    assert_eq!(report.cycles, 4);
    assert_eq!(report.failures, 0);
    assert_eq!(
        runner.started_minutes(),
        vec!["05-10 10:59", "05-10 11:00", "05-10 17:00", "05-11 05:00"]
    );
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn failed_cycle_backs_off_instead_of_waiting_for_the_slot() {
    let cancel = CancellationToken::new();
    let runner = RecordingRunner::new(3, cancel.clone()).failing_first(2);
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::starting_at(utc(6, 0)));
    let scheduler =
        SlotScheduler::new(kyiv_schedule(), clock).with_error_backoff(Duration::from_secs(60));

    let report = scheduler.run(&runner, cancel).await;

    assert_eq!(report.cycles, 3);
    assert_eq!(report.failures, 2);
    assert_eq!(
        runner.started_minutes(),
        vec!["05-10 06:00", "05-10 06:01", "05-10 06:02"]
    );
}

#[tokio::test(start_paused = true)]
async fn idle_state_reports_the_wake_instant_and_cancel_stops_the_sleep() {
    let cancel = CancellationToken::new();
    let runner = Arc::new(RecordingRunner::new(usize::MAX, cancel.clone()));
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::starting_at(utc(10, 59)));
    let scheduler = Arc::new(SlotScheduler::new(kyiv_schedule(), clock));

    let handle = {
        let scheduler = scheduler.clone();
        let runner = runner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(runner.as_ref(), cancel).await })
    };

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(
        scheduler.state(),
        SchedulerState::Idle {
            wake_at: utc(11, 0)
        }
    );

    cancel.cancel();
    let report = handle.await.expect("scheduler task");

    assert_eq!(report.cycles, 1);
    assert_eq!(runner.started_minutes(), vec!["05-10 10:59"]);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn running_cycle_completes_before_cancellation_is_observed() {
    let cancel = CancellationToken::new();
    let runner = Arc::new(
        RecordingRunner::new(usize::MAX, cancel.clone()).taking(Duration::from_secs(300)),
    );
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::starting_at(utc(10, 0)));
    let scheduler = Arc::new(SlotScheduler::new(kyiv_schedule(), clock));

    let handle = {
        let scheduler = scheduler.clone();
        let runner = runner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(runner.as_ref(), cancel).await })
    };

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(scheduler.state(), SchedulerState::Running);
    cancel.cancel();

    let report = handle.await.expect("scheduler task");
    assert_eq!(report.cycles, 1);
    assert_eq!(report.failures, 0);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[test]
fn schedule_sorts_and_dedups_slots() {
    let labels: Vec<String> = kyiv_schedule()
        .slots()
        .iter()
        .map(|slot| slot.label())
        .collect();
    assert_eq!(labels, vec!["08:00", "14:00", "20:00"]);
}
