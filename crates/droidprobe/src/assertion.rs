//! Assertions for scenario verification.
//!
//! Every predicate is pure: it looks at state a scenario already collected
//! and returns an [`AssertionResult`]. Scenarios turn a failed result into a
//! `Failed` verdict with [`AssertionResult::into_result`].

use crate::locator::ElementHandle;
use crate::result::{ProbeError, ProbeResult};

/// Result of an assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Human-readable message
    pub message: String,
}

impl AssertionResult {
    /// Create a passing assertion result
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
        }
    }

    /// Create a failing assertion result
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }

    /// `Ok(())` if passed, [`ProbeError::AssertionFailed`] otherwise
    pub fn into_result(self) -> ProbeResult<()> {
        if self.passed {
            Ok(())
        } else {
            Err(ProbeError::assertion(self.message))
        }
    }
}

/// Assertion helpers
#[derive(Debug, Clone, Copy)]
pub struct Assertion;

impl Assertion {
    /// The foreground package is the app under test
    #[must_use]
    pub fn identity(expected: &str, actual: &str) -> AssertionResult {
        if expected == actual {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!(
                "expected package '{expected}' in foreground, found '{actual}'"
            ))
        }
    }

    /// The device still answers automation requests
    #[must_use]
    pub fn liveness(responsive: bool) -> AssertionResult {
        if responsive {
            AssertionResult::pass()
        } else {
            AssertionResult::fail("device stopped responding")
        }
    }

    /// A lookup found its element
    #[must_use]
    pub fn element_present(handle: Option<&ElementHandle>, description: &str) -> AssertionResult {
        if handle.is_some() {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!("expected {description} on screen"))
        }
    }
}
