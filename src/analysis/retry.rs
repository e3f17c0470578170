use std::time::Duration;

use backon::ExponentialBuilder;

// Longest pause between two attempts, whatever the backoff factor
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff_factor: 1.0,
        }
    }

    // Delay before attempt n+1 is `delay * factor^(n-1)`, capped at
    // MAX_RETRY_DELAY. Factors below 1.0 are treated as fixed.
    pub fn into_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.delay)
            .with_max_delay(MAX_RETRY_DELAY)
            .with_factor(self.backoff_factor.max(1.0) as f32)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}
