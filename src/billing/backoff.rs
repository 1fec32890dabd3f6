//! Retry policy for billing and identity calls.
//!
//! Delays grow geometrically from `initial_delay` and never exceed `max_delay`,
//! including when the server asks for a longer wait through `Retry-After`.

use std::time::Duration;

/// Bounded retry policy applied to every billing and identity request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Fraction of the delay randomly added or removed (0.0 to 1.0).
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// Delay before retry `attempt` (1-based).
    ///
    /// A server-provided `Retry-After` stretches the delay but is capped at
    /// `max_delay`, so a hostile or broken header cannot stall a run.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff_for(attempt);
        match retry_after {
            Some(server) => server.max(backoff).min(self.max_delay),
            None => backoff,
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let max_ms = self.max_delay.as_millis() as f64;
        let base = self.initial_delay.as_millis() as f64
            * self.factor.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(max_ms);

        let jitter = self.jitter.clamp(0.0, 1.0);
        let delayed = if jitter > 0.0 {
            let spread = capped * jitter;
            (capped + rand::random::<f64>() * spread * 2.0 - spread).clamp(0.0, max_ms)
        } else {
            capped
        };

        Duration::from_millis(delayed as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            jitter: 0.1,
        }
    }
}
