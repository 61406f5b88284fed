use std::time::Duration;
use tracing::warn;

/// Decision returned by the retry policy after a failed poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the poll after `delay` (includes 1-based attempt number).
    Retry { attempt: u32, delay: Duration },
    /// Retry budget exhausted (or retries disabled) — the failure is fatal.
    GiveUp,
}

/// Retry policy for failed fetches.
///
/// With `max_retries == 0` every fetch failure is fatal to the monitor loop.
/// Otherwise the same poll is retried with exponential backoff until the
/// budget runs out. A successful poll resets the attempt counter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    current_attempt: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            current_attempt: 0,
        }
    }

    /// Fail on the first error.
    pub fn never() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Record a failure and decide whether to try again.
    pub fn on_failure(&mut self) -> RetryDecision {
        if self.current_attempt >= self.max_retries {
            if self.max_retries > 0 {
                warn!(max_retries = self.max_retries, "fetch retries exhausted");
            }
            return RetryDecision::GiveUp;
        }

        self.current_attempt += 1;
        let delay = backoff_delay(self.initial_delay, self.current_attempt - 1, self.max_delay);
        warn!(
            attempt = self.current_attempt,
            max_retries = self.max_retries,
            delay_ms = delay.as_millis() as u64,
            "fetch failed, retrying"
        );
        RetryDecision::Retry {
            attempt: self.current_attempt,
            delay,
        }
    }

    /// Reset the attempt counter after a successful poll.
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    /// Current attempt count (0 = no retries yet).
    #[allow(dead_code)]
    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

/// Calculate exponential backoff delay.
///
/// Returns `initial * 2^consecutive_count`, capped at `max`.
pub fn backoff_delay(initial: Duration, consecutive_count: u32, max: Duration) -> Duration {
    let shift = 1u64.checked_shl(consecutive_count).unwrap_or(u64::MAX);
    let initial_ms = initial.as_millis().min(u64::MAX as u128) as u64;
    let delay = Duration::from_millis(initial_ms.saturating_mul(shift));
    delay.min(max)
}
