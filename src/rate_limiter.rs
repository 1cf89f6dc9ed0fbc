//! Client-side request spacing.
//!
//! Autotask enforces per-tenant request budgets. The limiter spaces outgoing
//! requests evenly across a minute so a long pagination run does not burst.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces requests so at most `requests_per_minute` start in any minute.
///
/// Clones share the same schedule.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Creates a limiter for the given budget. A budget of zero disables spacing.
    pub fn new(requests_per_minute: u32) -> Self {
        let interval = (requests_per_minute > 0)
            .then(|| Duration::from_secs(60) / requests_per_minute);
        Self::with_interval(interval)
    }

    /// Creates a limiter that never waits.
    pub fn disabled() -> Self {
        Self::with_interval(None)
    }

    fn with_interval(interval: Option<Duration>) -> Self {
        Self {
            interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Minimum spacing between request starts, if limiting is enabled.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Waits for the next free slot and returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let Some(interval) = self.interval else {
            return Duration::ZERO;
        };

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *next_slot = Some(slot + interval);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit applied");
            tokio::time::sleep_until(slot).await;
        }
        wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_budget() {
        assert_eq!(RateLimiter::new(60).interval(), Some(Duration::from_secs(1)));
        assert_eq!(RateLimiter::new(120).interval(), Some(Duration::from_millis(500)));
        assert_eq!(RateLimiter::new(0).interval(), None);
    }

    #[tokio::test]
    async fn test_first_request_does_not_wait() {
        let limiter = RateLimiter::new(60);
        let start = std::time::Instant::now();
        assert_eq!(limiter.acquire().await, Duration::ZERO);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_subsequent_requests_are_spaced() {
        // 1200 per minute = one slot every 50ms
        let limiter = RateLimiter::new(1200);
        limiter.acquire().await;

        let start = std::time::Instant::now();
        let waited = limiter.acquire().await;
        let elapsed = start.elapsed();

        assert!(waited > Duration::from_millis(30), "waited {:?}", waited);
        assert!(elapsed >= Duration::from_millis(30), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_clones_share_schedule() {
        let limiter = RateLimiter::new(1200);
        let clone = limiter.clone();
        limiter.acquire().await;
        assert!(clone.acquire().await > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_disabled_never_waits() {
        let limiter = RateLimiter::disabled();
        for _ in 0..5 {
            assert_eq!(limiter.acquire().await, Duration::ZERO);
        }
    }
}
