//! Retry coordinator for backend generation calls.
//!
//! Wraps one backend call with bounded retry for the whitelisted transient
//! failure kinds (generation timeout, backend 5xx). Everything else
//! propagates on first occurrence, consuming no further attempts.

use std::time::Duration;

use genrelay_types::error::{ConfigError, GenerationError};

/// Default pause between attempts.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Outcome of one orchestrated, possibly-retried call.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// Final result: the successful value, or the last error observed.
    pub result: Result<T, GenerationError>,
    /// How many attempts were made (1-based, counts the first call).
    pub attempts_used: u32,
}

impl<T> RetryOutcome<T> {
    /// Whether the wrapped call eventually succeeded.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Bounded fixed-delay retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy attempting the call up to `max_attempts` times with
    /// the default 5 s pause between attempts.
    ///
    /// # Errors
    ///
    /// `max_attempts` must be at least 1.
    pub fn new(max_attempts: u32) -> Result<Self, ConfigError> {
        Self::with_delay(max_attempts, DEFAULT_RETRY_DELAY)
    }

    /// Create a policy with a custom inter-attempt delay.
    pub fn with_delay(max_attempts: u32, delay: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidRetryCount(
                "at least one attempt is required".to_string(),
            ));
        }
        Ok(Self { max_attempts, delay })
    }

    /// The configured attempt bound.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, retrying retryable failures up to the attempt bound.
    ///
    /// The delay between attempts is a cooperative suspend point
    /// (`tokio::time::sleep`); concurrent pipelines keep running. Each
    /// retry is logged with the attempt number and the failure.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts_used: attempt,
                    };
                }
                Err(err) => {
                    if !err.is_retryable() {
                        tracing::debug!(attempt, error = %err, "non-retryable failure, propagating");
                        return RetryOutcome {
                            result: Err(err),
                            attempts_used: attempt,
                        };
                    }
                    if attempt >= self.max_attempts {
                        tracing::warn!(attempt, error = %err, "retry attempts exhausted");
                        return RetryOutcome {
                            result: Err(err),
                            attempts_used: attempt,
                        };
                    }
                    tracing::warn!(
                        attempt,
                        error = %err,
                        delay_secs = self.delay.as_secs(),
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
