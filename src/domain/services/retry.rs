use std::time::Duration;

/// Exponential backoff for side-effect jobs.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(60 * 60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: i32) -> Self {
        Self { max_attempts: max_attempts.max(1), ..Self::default() }
    }

    /// Delay before retry number `attempt` (1-based), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: i32) -> Duration {
        let exp = attempt.max(1) - 1;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Whether a job that has now failed `attempts` times gets another try.
    pub fn should_retry(&self, attempts: i32) -> bool {
        attempts < self.max_attempts
    }
}
