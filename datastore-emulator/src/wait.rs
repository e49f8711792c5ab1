//! Polling for eventually consistent reads.

use crate::error::{EmulatorError, EmulatorResult};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How long [`eventually`] keeps trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Total number of checks, including the first one.
    pub attempts: u32,
    /// Pause between two checks.
    pub interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            attempts: 50,
            interval: Duration::from_millis(100),
        }
    }
}

impl WaitConfig {
    #[must_use]
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// A short budget for strongly consistent local stores.
    #[must_use]
    pub const fn fast() -> Self {
        Self::new(10, Duration::from_millis(10))
    }
}

/// Re-runs `check` until it succeeds or the attempts are spent.
///
/// Returns the first success. On exhaustion the last failure is reported as
/// [`EmulatorError::NotSettled`].
pub async fn eventually<T, E, F, Fut>(config: WaitConfig, mut check: F) -> EmulatorResult<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = config.attempts.max(1);
    let mut last = String::new();

    for attempt in 1..=attempts {
        match check().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last = e.to_string();
                debug!(attempt, attempts, error = %last, "Condition not met yet");
            }
        }
        if attempt < attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    Err(EmulatorError::NotSettled { attempts, last })
}
