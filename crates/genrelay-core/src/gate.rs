//! Admission gate bounding outbound backend calls.
//!
//! All pipeline invocations in the process share one gate. Admission
//! requires two conditions at once: the rolling-window rate bound (at most
//! `budget` grants in the last `WINDOW_SECS` seconds) and the concurrency
//! bound (a counting permit pool). The grant itself is atomic: purging old
//! timestamps, checking the count, taking a permit, and recording the new
//! timestamp all happen under one lock section, so an admitted caller can
//! never retroactively overfill an already-checked window.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use genrelay_types::error::ConfigError;

/// Rolling window length in seconds.
const WINDOW_SECS: u64 = 10;

/// Minimum sleep while waiting for the window to drain.
const MIN_WAIT: Duration = Duration::from_millis(100);

/// Capacity grant for one backend call.
///
/// Held for the duration of the call; dropping it returns the concurrency
/// permit, which also covers cancellation while in flight.
#[derive(Debug)]
pub struct AdmissionTicket {
    _permit: OwnedSemaphorePermit,
}

/// Shared gate bounding rate and concurrency of backend calls.
///
/// Cloning produces a shared view of the same counters.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    window: Duration,
    budget: usize,
    grants: Arc<Mutex<VecDeque<Instant>>>,
    permits: Arc<Semaphore>,
}

impl AdmissionGate {
    /// Create a gate admitting `rate_per_sec * 10` calls per rolling 10 s
    /// window, with at most `concurrent` calls in flight.
    ///
    /// # Errors
    ///
    /// Rejects rates below 0.1/s (zero window budget) and `concurrent == 0`.
    pub fn new(rate_per_sec: f64, concurrent: usize) -> Result<Self, ConfigError> {
        let budget = (rate_per_sec * WINDOW_SECS as f64) as usize;
        if budget == 0 {
            return Err(ConfigError::InvalidRate(format!(
                "rate {rate_per_sec}/s yields an empty window budget; minimum is 0.1/s"
            )));
        }
        if concurrent == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "at least one simultaneous request is required".to_string(),
            ));
        }
        Ok(Self {
            window: Duration::from_secs(WINDOW_SECS),
            budget,
            grants: Arc::new(Mutex::new(VecDeque::new())),
            permits: Arc::new(Semaphore::new(concurrent)),
        })
    }

    /// Grants admitted in the current window (purged view).
    pub async fn in_window(&self) -> usize {
        let mut grants = self.grants.lock().await;
        Self::purge(&mut grants, self.window);
        grants.len()
    }

    /// Block until both bounds admit a call, then return a ticket.
    ///
    /// Never fails; waits as long as necessary, bounded only by caller
    /// cancellation. Dropping the future while it waits leaves no state
    /// behind (the timestamp is only recorded on a successful grant).
    pub async fn acquire(&self) -> AdmissionTicket {
        loop {
            let wait = {
                let mut grants = self.grants.lock().await;
                Self::purge(&mut grants, self.window);
                if grants.len() < self.budget {
                    let permit = self
                        .permits
                        .clone()
                        .acquire_owned()
                        .await
                        .expect("admission semaphore never closes");
                    grants.push_back(Instant::now());
                    return AdmissionTicket { _permit: permit };
                }
                // Window full: wait until the oldest grant ages out.
                let oldest = *grants.front().expect("full window has a front");
                (oldest + self.window)
                    .saturating_duration_since(Instant::now())
                    .max(MIN_WAIT)
            };
            tokio::time::sleep(wait).await;
        }
    }

    fn purge(grants: &mut VecDeque<Instant>, window: Duration) {
        let now = Instant::now();
        while let Some(front) = grants.front() {
            if now.duration_since(*front) >= window {
                grants.pop_front();
            } else {
                break;
            }
        }
    }
}
