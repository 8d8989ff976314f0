use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::{ExtractionError, TranscribeError, RATE_LIMIT_SUGGESTION};

/// Bounded retry with exponential backoff. Only rate-limit failures are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier: multiplier.max(1.0),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_delay(),
            config.backoff_multiplier,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Grow the backoff delay, saturating at `Duration::MAX`
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.multiplier).unwrap_or(Duration::MAX)
    }

    /// Run `operation` until it succeeds, fails terminally, exhausts its attempts or is cancelled.
    pub async fn run<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, TranscribeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TranscribeError>>,
    {
        let mut attempt = 1;
        let mut delay = self.initial_delay;

        loop {
            if cancel.is_cancelled() {
                return Err(TranscribeError::Cancelled);
            }

            tracing::debug!(attempt, max_attempts = self.max_attempts, "Running extraction attempt");

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("Extraction succeeded after {} attempts", attempt);
                    }
                    return Ok(value);
                }
                Err(TranscribeError::Extraction(err)) if err.is_rate_limited() => {
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            "Still rate limited after {} attempts, giving up: {}",
                            attempt,
                            err
                        );
                        return Err(with_suggestion(err).into());
                    }

                    tracing::warn!(
                        "Rate limited (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        self.max_attempts,
                        delay,
                        err
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(TranscribeError::Cancelled),
                        _ = sleep(delay) => {}
                    }

                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2), 2.0)
    }
}

fn with_suggestion(err: ExtractionError) -> ExtractionError {
    match err {
        ExtractionError::RateLimited { message, .. } => ExtractionError::RateLimited {
            message,
            suggestion: Some(RATE_LIMIT_SUGGESTION.to_string()),
        },
        other => other,
    }
}
