//! Fixed-interval polling with an overall deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use fleet_core::{FleetResult, HealthSettings};

/// How often to poll and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn from_settings(settings: &HealthSettings) -> FleetResult<Self> {
        Ok(Self {
            interval: settings.interval()?,
            timeout: settings.timeout()?,
        })
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Result of [`wait_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready { attempts: u32, elapsed: Duration },
    TimedOut { attempts: u32, elapsed: Duration },
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            WaitOutcome::Ready { attempts, .. } | WaitOutcome::TimedOut { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Run `check` until it returns true or `policy.timeout` has passed.
///
/// `check` receives the 1-based attempt number. It always runs at least
/// once; the deadline is measured from the first attempt and only
/// consulted after a failed one.
pub async fn wait_until<F, Fut>(policy: PollPolicy, mut check: F) -> WaitOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if check(attempts).await {
            return WaitOutcome::Ready {
                attempts,
                elapsed: started.elapsed(),
            };
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.timeout {
            return WaitOutcome::TimedOut { attempts, elapsed };
        }
        trace!(attempts, ?elapsed, "not ready, sleeping");
        tokio::time::sleep(policy.interval).await;
    }
}
