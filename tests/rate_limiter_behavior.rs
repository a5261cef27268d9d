use std::sync::Arc;
use std::time::Duration;

use shelfwatch_core::{ProviderId, ProviderPolicy, RateLimiter};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn one_per_second_spaces_consecutive_calls() {
    let limiter = RateLimiter::from_policy(&ProviderPolicy::default_for(ProviderId::ScrapingDog));
    let started = Instant::now();

    limiter.wait().await;
    limiter.wait().await;
    limiter.wait().await;

    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn window_admits_a_burst_up_to_the_limit() {
    let limiter = RateLimiter::new(3, Duration::from_secs(10));
    let started = Instant::now();

    for _ in 0..3 {
        limiter.wait().await;
    }
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(limiter.in_window().await, 3);

    limiter.wait().await;
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_budget() {
    let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(1)));
    let started = Instant::now();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.wait().await;
                Instant::now()
            })
        })
        .collect();

    let mut admitted = Vec::new();
    for handle in handles {
        admitted.push(handle.await.expect("waiter task"));
    }
    admitted.sort();

    for pair in admitted.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn idle_window_drains_old_admissions() {
    let limiter = RateLimiter::new(1, Duration::from_secs(1));
    limiter.wait().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(limiter.in_window().await, 0);

    let before = Instant::now();
    limiter.wait().await;
    assert_eq!(before.elapsed(), Duration::ZERO);
}
