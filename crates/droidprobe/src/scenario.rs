//! Scenarios, sessions and verdicts.
//!
//! A [`Scenario`] is a named sequence of `setup`, `action` and `verify`
//! phases driven through a [`Session`]. The session lends the run's single
//! [`DeviceController`] to the scenario together with the configuration, so
//! scenarios never own device state.
//!
//! ```text
//! NotStarted ──► Running ──┬──► Passed
//!                          ├──► Failed   (assertion or identity)
//!                          └──► Errored  (device or automation)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::assertion::Assertion;
use crate::config::HarnessConfig;
use crate::driver::{DeviceController, IdleOutcome, Orientation};
use crate::locator::{ElementHandle, ElementQuery, ObjectLocator};
use crate::permission::{PermissionFlowReport, PermissionFlowRunner};
use crate::result::{ProbeError, ProbeResult};

// =============================================================================
// SCENARIO TRAIT
// =============================================================================

/// One end-to-end check against the app under test.
///
/// Phases run in order and stop at the first error. Assertion-class errors
/// end the scenario as [`Verdict::Failed`], anything else as
/// [`Verdict::Errored`].
pub trait Scenario: fmt::Debug {
    /// Stable identifier used for filtering and reports
    fn name(&self) -> &'static str;

    /// One-line summary
    fn description(&self) -> &'static str;

    /// Bring the app into the state the action expects
    fn setup(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        let _ = session;
        Ok(())
    }

    /// Drive the interaction under test
    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()>;

    /// Check the observable outcome
    fn verify(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        let _ = session;
        Ok(())
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Device access lent to one scenario
#[derive(Debug)]
pub struct Session<'a> {
    controller: &'a mut DeviceController,
    config: &'a HarnessConfig,
    locator: ObjectLocator,
    permissions: PermissionFlowRunner,
}

impl<'a> Session<'a> {
    /// Lend `controller` under `config`
    pub fn new(controller: &'a mut DeviceController, config: &'a HarnessConfig) -> Self {
        let locator = ObjectLocator::for_controller(controller);
        let permissions = config.permission_runner();
        Self {
            controller,
            config,
            locator,
            permissions,
        }
    }

    /// The device
    pub fn controller(&mut self) -> &mut DeviceController {
        self.controller
    }

    /// Configuration in effect
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        self.config
    }

    /// Package identifier of the app under test
    #[must_use]
    pub fn package(&self) -> &str {
        &self.config.package
    }

    /// Idle-wait with the configured idle timeout
    pub fn wait_for_idle(&mut self) -> ProbeResult<IdleOutcome> {
        self.controller.wait_for_idle(self.config.timeouts.idle())
    }

    /// Idle-wait with the configured settle timeout
    pub fn settle(&mut self) -> ProbeResult<IdleOutcome> {
        self.controller.wait_for_idle(self.config.timeouts.settle())
    }

    /// Walk the permission prompts once
    pub fn grant_permissions(&mut self) -> ProbeResult<PermissionFlowReport> {
        self.permissions.run(self.controller)
    }

    /// Look for an element
    pub fn find(
        &mut self,
        query: &ElementQuery,
        timeout: Duration,
    ) -> ProbeResult<Option<ElementHandle>> {
        self.locator.find(self.controller, query, timeout)
    }

    /// Click a located element
    pub fn click(&mut self, handle: ElementHandle) -> ProbeResult<()> {
        self.locator.click(self.controller, handle)
    }

    /// Press back
    pub fn press_back(&mut self) -> ProbeResult<()> {
        self.controller.press_back()
    }

    /// Rotate the screen
    pub fn set_orientation(&mut self, orientation: Orientation) -> ProbeResult<()> {
        self.controller.set_orientation(orientation)
    }

    /// The app under test owns the display.
    ///
    /// Fails with [`ProbeError::IdentityMismatch`] otherwise.
    pub fn expect_identity(&mut self) -> ProbeResult<()> {
        let actual = self.controller.current_foreground_package()?;
        self.check_identity(actual, false).map(drop)
    }

    /// Scenario-start variant of [`Self::expect_identity`]: a configured
    /// overlay (system permission dialog) may cover the target.
    ///
    /// Returns the overlay package when one was accepted in place of the
    /// target.
    pub fn expect_identity_or_overlay(&mut self) -> ProbeResult<Option<String>> {
        let actual = self.controller.current_foreground_package()?;
        self.check_identity(actual, true)
    }

    fn check_identity(&self, actual: String, allow_overlay: bool) -> ProbeResult<Option<String>> {
        if allow_overlay && self.config.is_overlay(&actual) {
            tracing::info!(
                overlay = %actual,
                target = %self.config.package,
                "target covered by overlay"
            );
            return Ok(Some(actual));
        }
        if Assertion::identity(&self.config.package, &actual).passed {
            Ok(None)
        } else {
            Err(ProbeError::IdentityMismatch {
                expected: self.config.package.clone(),
                actual,
            })
        }
    }

    /// The device still answers
    pub fn expect_responsive(&mut self) -> ProbeResult<()> {
        Assertion::liveness(self.controller.is_responsive()).into_result()
    }
}

// =============================================================================
// STATE AND VERDICT
// =============================================================================

/// Lifecycle of one scenario execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    /// Not yet started
    NotStarted,
    /// Phases executing
    Running,
    /// All phases succeeded
    Passed,
    /// An assertion did not hold
    Failed,
    /// The environment failed
    Errored,
}

impl ScenarioState {
    /// Whether no further transition is allowed
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Errored)
    }

    /// Move to `next`, rejecting anything but
    /// `NotStarted -> Running -> terminal`
    pub fn transition(self, next: Self) -> ProbeResult<Self> {
        let allowed = match self {
            Self::NotStarted => next == Self::Running,
            Self::Running => next.is_terminal(),
            Self::Passed | Self::Failed | Self::Errored => false,
        };
        if allowed {
            Ok(next)
        } else {
            Err(ProbeError::InvalidState {
                message: format!("cannot move scenario from {self} to {next}"),
            })
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Final outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Every phase succeeded
    Passed,
    /// An assertion or identity check did not hold
    Failed {
        /// What did not hold
        reason: String,
    },
    /// The device or automation surface failed
    Errored {
        /// What failed
        reason: String,
    },
}

impl Verdict {
    /// Classify an error raised by a phase
    #[must_use]
    pub fn from_error(err: &ProbeError) -> Self {
        if err.is_assertion() {
            Self::Failed {
                reason: err.to_string(),
            }
        } else {
            Self::Errored {
                reason: err.to_string(),
            }
        }
    }

    /// Verdict for the result of running every phase
    #[must_use]
    pub fn from_outcome(outcome: &ProbeResult<()>) -> Self {
        match outcome {
            Ok(()) => Self::Passed,
            Err(err) => Self::from_error(err),
        }
    }

    /// Terminal state this verdict corresponds to
    #[must_use]
    pub const fn state(&self) -> ScenarioState {
        match self {
            Self::Passed => ScenarioState::Passed,
            Self::Failed { .. } => ScenarioState::Failed,
            Self::Errored { .. } => ScenarioState::Errored,
        }
    }

    /// Whether the scenario passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Failure or error reason
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed { reason } | Self::Errored { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "PASSED"),
            Self::Failed { reason } => write!(f, "FAILED: {reason}"),
            Self::Errored { reason } => write!(f, "ERRORED: {reason}"),
        }
    }
}

/// Tracks one scenario through its lifecycle; the verdict is set once
#[derive(Debug, Clone)]
pub struct ScenarioExecution {
    name: String,
    state: ScenarioState,
    verdict: Option<Verdict>,
}

impl ScenarioExecution {
    /// New execution in `NotStarted`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ScenarioState::NotStarted,
            verdict: None,
        }
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> ScenarioState {
        self.state
    }

    /// Verdict, once finished
    #[must_use]
    pub const fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// `NotStarted -> Running`
    pub fn start(&mut self) -> ProbeResult<()> {
        self.state = self.state.transition(ScenarioState::Running)?;
        tracing::debug!(scenario = %self.name, "scenario running");
        Ok(())
    }

    /// `Running -> terminal`; a second call is rejected
    pub fn finish(&mut self, verdict: Verdict) -> ProbeResult<()> {
        self.state = self.state.transition(verdict.state())?;
        self.verdict = Some(verdict);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable)]
mod tests {
    use super::*;
    use crate::driver::{LAUNCHER_PACKAGE, PERMISSION_CONTROLLER_PACKAGE};
    use crate::mock::{MockDevice, MockOp};

    const PKG: &str = "com.stickergaurdman";

    fn fast_config() -> HarnessConfig {
        let mut config = HarnessConfig::for_package(PKG);
        config.timeouts.idle_ms = 30;
        config.timeouts.settle_ms = 30;
        config.timeouts.prompt_ms = 30;
        config.timeouts.poll_interval_ms = 5;
        config
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_happy_path() {
            let running = ScenarioState::NotStarted
                .transition(ScenarioState::Running)
                .unwrap();
            assert_eq!(running.transition(ScenarioState::Failed).unwrap(), ScenarioState::Failed);
        }

        #[test]
        fn test_cannot_skip_running() {
            assert!(ScenarioState::NotStarted
                .transition(ScenarioState::Passed)
                .is_err());
        }

        #[test]
        fn test_terminal_is_final() {
            for terminal in [ScenarioState::Passed, ScenarioState::Failed, ScenarioState::Errored] {
                assert!(terminal.is_terminal());
                for next in [
                    ScenarioState::NotStarted,
                    ScenarioState::Running,
                    ScenarioState::Passed,
                    ScenarioState::Failed,
                    ScenarioState::Errored,
                ] {
                    let err = terminal.transition(next).unwrap_err();
                    assert!(matches!(err, ProbeError::InvalidState { .. }));
                }
            }
        }
    }

    mod verdict_tests {
        use super::*;

        #[test]
        fn test_classification() {
            assert!(Verdict::from_outcome(&Ok(())).is_passed());
            assert_eq!(
                Verdict::from_error(&ProbeError::assertion("x")).state(),
                ScenarioState::Failed
            );
            assert_eq!(
                Verdict::from_error(&ProbeError::IdentityMismatch {
                    expected: "a".into(),
                    actual: "b".into()
                })
                .state(),
                ScenarioState::Failed
            );
            assert_eq!(
                Verdict::from_error(&ProbeError::unreachable("gone")).state(),
                ScenarioState::Errored
            );
        }

        #[test]
        fn test_reason() {
            assert_eq!(Verdict::Passed.reason(), None);
            let v = Verdict::from_error(&ProbeError::assertion("no settings"));
            assert!(v.reason().unwrap().contains("no settings"));
        }

        #[test]
        fn test_serialization() {
            let json = serde_json::to_value(Verdict::Errored {
                reason: "adb gone".into(),
            })
            .unwrap();
            assert_eq!(json["verdict"], "errored");
            assert_eq!(json["reason"], "adb gone");
        }
    }

    mod execution_tests {
        use super::*;

        #[test]
        fn test_lifecycle() {
            let mut exec = ScenarioExecution::new("app_launches");
            assert_eq!(exec.state(), ScenarioState::NotStarted);
            exec.start().unwrap();
            exec.finish(Verdict::Passed).unwrap();
            assert_eq!(exec.state(), ScenarioState::Passed);
            assert_eq!(exec.verdict(), Some(&Verdict::Passed));
        }

        #[test]
        fn test_verdict_cannot_change() {
            let mut exec = ScenarioExecution::new("app_launches");
            exec.start().unwrap();
            exec.finish(Verdict::Passed).unwrap();
            assert!(exec
                .finish(Verdict::Failed {
                    reason: "late".into()
                })
                .is_err());
            assert_eq!(exec.verdict(), Some(&Verdict::Passed));
        }

        #[test]
        fn test_double_start() {
            let mut exec = ScenarioExecution::new("x");
            exec.start().unwrap();
            assert!(exec.start().is_err());
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn test_identity_ok() {
            let device = MockDevice::new(PKG);
            let config = fast_config();
            let mut ctl = DeviceController::new(device).with_poll_interval(5);
            let mut session = Session::new(&mut ctl, &config);
            assert!(session.expect_identity().is_ok());
        }

        #[test]
        fn test_identity_mismatch() {
            let device = MockDevice::new(PKG);
            device.set_foreground(LAUNCHER_PACKAGE);
            let config = fast_config();
            let mut ctl = DeviceController::new(device).with_poll_interval(5);
            let mut session = Session::new(&mut ctl, &config);
            match session.expect_identity().unwrap_err() {
                ProbeError::IdentityMismatch { expected, actual } => {
                    assert_eq!(expected, PKG);
                    assert_eq!(actual, LAUNCHER_PACKAGE);
                }
                other => unreachable!("unexpected error {other}"),
            }
        }

        #[test]
        fn test_overlay_accepted_only_at_start() {
            let device = MockDevice::new(PKG);
            device.push_prompt(MockDevice::permission_prompt("Location?", "Allow"));
            let config = fast_config();
            let mut ctl = DeviceController::new(device).with_poll_interval(5);
            let mut session = Session::new(&mut ctl, &config);
            assert_eq!(
                session.expect_identity_or_overlay().unwrap().as_deref(),
                Some(PERMISSION_CONTROLLER_PACKAGE)
            );
            assert!(session.expect_identity().is_err());
        }

        #[test]
        fn test_identity_device_error_is_not_assertion() {
            let device = MockDevice::new(PKG);
            device.fail_on(MockOp::Package);
            let config = fast_config();
            let mut ctl = DeviceController::new(device).with_poll_interval(5);
            let mut session = Session::new(&mut ctl, &config);
            assert!(!session.expect_identity().unwrap_err().is_assertion());
        }

        #[test]
        fn test_responsive() {
            let device = MockDevice::new(PKG);
            let config = fast_config();
            let mut ctl = DeviceController::new(device.clone()).with_poll_interval(5);
            let mut session = Session::new(&mut ctl, &config);
            assert!(session.expect_responsive().is_ok());
            device.set_unreachable(true);
            assert!(session.expect_responsive().unwrap_err().is_assertion());
        }

        #[test]
        fn test_grant_permissions_uses_config() {
            let device = MockDevice::new(PKG);
            device.push_prompt(MockDevice::permission_prompt("Camera?", "허용"));
            let config = fast_config();
            let mut ctl = DeviceController::new(device.clone()).with_poll_interval(5);
            let mut session = Session::new(&mut ctl, &config);
            assert_eq!(session.grant_permissions().unwrap().clicks(), 1);
            assert_eq!(device.pending_prompts(), 0);
        }
    }
}
