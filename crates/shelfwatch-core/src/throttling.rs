use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::provider_policy::ProviderPolicy;

/// Sliding-window limiter: at most `max_requests` admissions inside any
/// trailing `period`.
///
/// The whole prune-check-sleep-record sequence runs under one async mutex, so
/// concurrent callers are admitted one at a time in lock-arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    period: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, period: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1) as usize,
            period,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(policy.quota_limit, policy.quota_window)
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Suspends until a slot in the window is free, then records the call.
    /// Never fails; it only delays.
    pub async fn wait(&self) {
        let mut admitted = self.admitted.lock().await;
        let mut now = Instant::now();
        prune(&mut admitted, now, self.period);

        while admitted.len() >= self.max_requests {
            let Some(oldest) = admitted.front().copied() else {
                break;
            };
            let sleep_for = (oldest + self.period).saturating_duration_since(now);
            tracing::debug!(
                sleep_ms = sleep_for.as_millis() as u64,
                "request budget exhausted, waiting"
            );
            tokio::time::sleep(sleep_for).await;
            now = Instant::now();
            prune(&mut admitted, now, self.period);
        }

        admitted.push_back(now);
    }

    /// Number of admissions still inside the trailing window.
    pub async fn in_window(&self) -> usize {
        let mut admitted = self.admitted.lock().await;
        prune(&mut admitted, Instant::now(), self.period);
        admitted.len()
    }
}

fn prune(admitted: &mut VecDeque<Instant>, now: Instant, period: Duration) {
    while let Some(oldest) = admitted.front() {
        if now.saturating_duration_since(*oldest) >= period {
            admitted.pop_front();
        } else {
            break;
        }
    }
}
