use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

// Shared by every worker: minimum spacing between acquisitions plus an
// optional cap per minute window
#[derive(Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    per_minute: Option<u32>,
    state: Arc<Mutex<RateLimitState>>,
}

struct RateLimitState {
    next_slot: Option<Instant>,
    requests_this_minute: u32,
    minute_start: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, per_minute: Option<u32>) -> Self {
        Self {
            min_interval,
            per_minute: per_minute.filter(|n| *n > 0),
            state: Arc::new(Mutex::new(RateLimitState {
                next_slot: None,
                requests_this_minute: 0,
                minute_start: None,
            })),
        }
    }

    pub fn fixed_interval(min_interval: Duration) -> Self {
        Self::new(min_interval, None)
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO, None)
    }

    pub async fn wait(&self) {
        // Reserve the slot under the lock, sleep outside it; waiters are
        // served in arrival order
        let slot = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let mut slot = state.next_slot.map_or(now, |next| next.max(now));

            if let Some(cap) = self.per_minute {
                let window_start = *state.minute_start.get_or_insert(slot);
                if slot.duration_since(window_start) >= WINDOW {
                    state.minute_start = Some(slot);
                    state.requests_this_minute = 0;
                } else if state.requests_this_minute >= cap {
                    // Window full, push to the start of the next one
                    slot = window_start + WINDOW;
                    state.minute_start = Some(slot);
                    state.requests_this_minute = 0;
                }
                state.requests_this_minute += 1;
            }

            state.next_slot = Some(slot + self.min_interval);
            slot
        };

        if slot > Instant::now() {
            tracing::trace!("Rate limited, waiting {:?}", slot - Instant::now());
            sleep_until(slot).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_spaces_acquisitions() {
        let limiter = RateLimiter::fixed_interval(Duration::from_millis(500));
        let start = Instant::now();

        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        limiter.wait().await;
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_minute_cap_defers_to_next_window() {
        let limiter = RateLimiter::new(Duration::ZERO, Some(2));
        let start = Instant::now();

        limiter.wait().await;
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_between_clones() {
        let limiter = RateLimiter::fixed_interval(Duration::from_secs(1));
        let other = limiter.clone();
        let start = Instant::now();

        tokio::join!(limiter.wait(), other.wait());
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
