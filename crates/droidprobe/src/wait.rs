//! Bounded polling waits.
//!
//! Every wait in the harness goes through [`Waiter`]: a probe is evaluated
//! immediately, then re-evaluated at a fixed interval until it yields a value
//! or the timeout elapses. Running out of time is reported through
//! [`WaitResult::success`], never as an error; only a failing probe aborts
//! the wait.

use crate::result::ProbeResult;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default idle-wait timeout (5 seconds)
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 5_000;

/// Default settle timeout after an interaction (1 second)
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 1_000;

/// Default timeout when looking for a permission prompt (1 second)
pub const DEFAULT_PROMPT_TIMEOUT_MS: u64 = 1_000;

/// Default polling interval (250ms); a hierarchy dump is not cheap
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a wait operation
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Whether the awaited condition was observed
    pub success: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the probe ran
    pub polls: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitResult {
    /// Create a successful wait result
    #[must_use]
    pub fn success(elapsed: Duration, polls: u32, waited_for: impl Into<String>) -> Self {
        Self {
            success: true,
            elapsed,
            polls,
            waited_for: waited_for.into(),
        }
    }

    /// Create a timeout wait result
    #[must_use]
    pub fn timeout(elapsed: Duration, polls: u32, waited_for: impl Into<String>) -> Self {
        Self {
            success: false,
            elapsed,
            polls,
            waited_for: waited_for.into(),
        }
    }
}

/// Value produced by [`Waiter::poll_for`] together with the wait bookkeeping
#[derive(Debug, Clone)]
pub struct Polled<T> {
    /// Value the probe yielded, `None` on timeout
    pub value: Option<T>,
    /// Timing of the wait
    pub result: WaitResult,
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Waiter for synchronization operations
#[derive(Debug, Clone, Copy, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter with the given options
    #[must_use]
    pub const fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Poll `probe` until it yields a value or the timeout elapses.
    ///
    /// The probe always runs at least once, even with a zero timeout. Sleeps
    /// are clipped to the remaining budget, so the wait returns within the
    /// timeout plus the duration of one probe.
    pub fn poll_for<T, F>(&self, description: &str, mut probe: F) -> ProbeResult<Polled<T>>
    where
        F: FnMut() -> ProbeResult<Option<T>>,
    {
        let start = Instant::now();
        let timeout = self.options.timeout();
        let interval = self.options.poll_interval();
        let mut polls = 0u32;

        loop {
            polls += 1;
            if let Some(value) = probe()? {
                return Ok(Polled {
                    value: Some(value),
                    result: WaitResult::success(start.elapsed(), polls, description),
                });
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                tracing::debug!(
                    waited_for = description,
                    polls,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "wait timed out"
                );
                return Ok(Polled {
                    value: None,
                    result: WaitResult::timeout(elapsed, polls, description),
                });
            }
            std::thread::sleep(interval.min(timeout - elapsed));
        }
    }

    /// Poll a boolean predicate until it holds or the timeout elapses
    pub fn wait_until<F>(&self, description: &str, mut predicate: F) -> ProbeResult<WaitResult>
    where
        F: FnMut() -> ProbeResult<bool>,
    {
        let polled = self.poll_for(description, || Ok(predicate()?.then_some(())))?;
        Ok(polled.result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
