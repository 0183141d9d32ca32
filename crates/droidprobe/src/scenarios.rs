//! Built-in scenarios.
//!
//! The standard suite covers launch, the permission flow, home screen,
//! settings navigation, service availability, rotation and back handling.
//! Scenarios that need a granted app call [`PermissionsRequest::grant`] in
//! their setup instead of depending on an earlier scenario.

use crate::assertion::Assertion;
use crate::driver::{Orientation, LAUNCHER_PACKAGE};
use crate::permission::PermissionFlowReport;
use crate::result::{ProbeError, ProbeResult};
use crate::scenario::{Scenario, Session};

/// Every built-in scenario, in run order
#[must_use]
pub fn standard_suite() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(AppLaunches),
        Box::new(PermissionsRequest),
        Box::new(HomeScreenDisplays),
        Box::new(NavigationToSettings),
        Box::new(LocationServiceAvailable),
        Box::new(CameraAvailable),
        Box::new(SurvivesRotation),
        Box::new(BackButtonHandling),
    ]
}

/// App reaches the foreground once the device settles
#[derive(Debug, Clone, Copy, Default)]
pub struct AppLaunches;

impl Scenario for AppLaunches {
    fn name(&self) -> &'static str {
        "app_launches"
    }

    fn description(&self) -> &'static str {
        "app is in the foreground after launch"
    }

    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.wait_for_idle()?;
        Ok(())
    }

    fn verify(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.expect_identity()
    }
}

/// Every permission prompt shown on first launch is answered
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionsRequest;

impl PermissionsRequest {
    /// Run the permission flow; used as setup by other scenarios
    pub fn grant(session: &mut Session<'_>) -> ProbeResult<PermissionFlowReport> {
        let report = session.grant_permissions()?;
        tracing::debug!(clicks = report.clicks(), "permission flow finished");
        session.expect_identity()?;
        Ok(report)
    }
}

impl Scenario for PermissionsRequest {
    fn name(&self) -> &'static str {
        "permissions_request"
    }

    fn description(&self) -> &'static str {
        "location, camera and notification prompts are granted"
    }

    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        let report = Self::grant(session)?;
        tracing::info!(
            clicks = report.clicks(),
            categories = report.records.len(),
            "permission prompts handled"
        );
        Ok(())
    }
}

/// Home screen loads after permissions are granted
#[derive(Debug, Clone, Copy, Default)]
pub struct HomeScreenDisplays;

impl Scenario for HomeScreenDisplays {
    fn name(&self) -> &'static str {
        "home_screen_displays"
    }

    fn description(&self) -> &'static str {
        "home screen settles after the permission flow"
    }

    fn setup(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        PermissionsRequest::grant(session).map(drop)
    }

    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.wait_for_idle()?;
        Ok(())
    }

    fn verify(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.expect_responsive()?;
        session.expect_identity()
    }
}

/// Settings affordance, when present, opens without breaking the app.
///
/// Absence passes: not every build exposes settings on the home screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationToSettings;

impl Scenario for NavigationToSettings {
    fn name(&self) -> &'static str {
        "navigation_to_settings"
    }

    fn description(&self) -> &'static str {
        "settings button opens settings when present"
    }

    fn setup(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        PermissionsRequest::grant(session)?;
        session.wait_for_idle()?;
        Ok(())
    }

    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        let query = session.config().settings_query();
        let timeout = session.config().timeouts.settle();
        let handle = session.find(&query, timeout)?;
        let present = Assertion::element_present(handle.as_ref(), "settings affordance");
        let Some(handle) = handle.filter(|_| present.passed) else {
            tracing::info!(reason = %present.message, "skipping settings navigation");
            return Ok(());
        };
        tracing::info!(label = %handle.node().text, "opening settings");
        session.click(handle)?;
        session.settle()?;
        Ok(())
    }

    fn verify(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.expect_responsive()?;
        session.expect_identity()
    }
}

/// Location-dependent app stays up in the foreground
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationServiceAvailable;

impl Scenario for LocationServiceAvailable {
    fn name(&self) -> &'static str {
        "location_service_available"
    }

    fn description(&self) -> &'static str {
        "app identity holds and device responds (location)"
    }

    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.expect_identity()
    }

    fn verify(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.expect_responsive()
    }
}

/// Camera-dependent app stays up in the foreground
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraAvailable;

impl Scenario for CameraAvailable {
    fn name(&self) -> &'static str {
        "camera_available"
    }

    fn description(&self) -> &'static str {
        "app identity holds and device responds (camera)"
    }

    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.expect_identity()
    }

    fn verify(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.expect_responsive()
    }
}

/// App keeps the foreground through a landscape round trip
#[derive(Debug, Clone, Copy, Default)]
pub struct SurvivesRotation;

impl SurvivesRotation {
    fn rotate_and_check(session: &mut Session<'_>, orientation: Orientation) -> ProbeResult<()> {
        session.set_orientation(orientation)?;
        session.settle()?;
        session.expect_identity().map_err(|err| {
            if err.is_assertion() {
                ProbeError::assertion(format!("app lost the foreground after rotating {orientation}: {err}"))
            } else {
                err
            }
        })
    }
}

impl Scenario for SurvivesRotation {
    fn name(&self) -> &'static str {
        "survives_rotation"
    }

    fn description(&self) -> &'static str {
        "app survives rotating to landscape and back"
    }

    fn setup(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        PermissionsRequest::grant(session).map(drop)
    }

    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        Self::rotate_and_check(session, Orientation::Left)?;
        Self::rotate_and_check(session, Orientation::Natural)
    }
}

/// Back on the home screen is handled: the app stays or exits cleanly
#[derive(Debug, Clone, Copy, Default)]
pub struct BackButtonHandling;

impl Scenario for BackButtonHandling {
    fn name(&self) -> &'static str {
        "back_button_handling"
    }

    fn description(&self) -> &'static str {
        "back on the home screen does not crash the app"
    }

    fn setup(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        PermissionsRequest::grant(session)?;
        session.wait_for_idle()?;
        Ok(())
    }

    fn action(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.press_back()?;
        session.settle()?;
        Ok(())
    }

    fn verify(&self, session: &mut Session<'_>) -> ProbeResult<()> {
        session.expect_responsive()?;
        let foreground = session.controller().current_foreground_package()?;
        if foreground == session.package() {
            tracing::debug!("app stayed in the foreground after back");
        } else if foreground == LAUNCHER_PACKAGE {
            tracing::debug!("app exited to the launcher after back");
        } else {
            tracing::info!(%foreground, "back left another package in the foreground");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::driver::{Bounds, DeviceController, UiNode};
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

    fn run_phases(scenario: &dyn Scenario, device: &MockDevice) -> ProbeResult<()> {
        let config = fast_config();
        let mut controller = DeviceController::new(device.clone()).with_poll_interval(5);
        let mut session = Session::new(&mut controller, &config);
        scenario.setup(&mut session)?;
        scenario.action(&mut session)?;
        scenario.verify(&mut session)
    }

    fn first_launch_device() -> MockDevice {
        let device = MockDevice::new(PKG);
        device.push_prompt(MockDevice::permission_prompt("Allow location?", "While using the app"));
        device.push_prompt(MockDevice::permission_prompt("Allow camera?", "Allow"));
        device.push_prompt(MockDevice::permission_prompt("Allow notifications?", "허용"));
        device
    }

    mod suite_tests {
        use super::*;

        #[test]
        fn test_standard_suite_names_are_unique() {
            let suite = standard_suite();
            let mut names: Vec<_> = suite.iter().map(|s| s.name()).collect();
            assert_eq!(names.len(), 8);
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), 8);
        }

        #[test]
        fn test_standard_suite_order() {
            let names: Vec<_> = standard_suite().iter().map(|s| s.name()).collect();
            assert_eq!(names[0], "app_launches");
            assert_eq!(names[1], "permissions_request");
            assert_eq!(names[7], "back_button_handling");
        }
    }

    mod launch_tests {
        use super::*;

        #[test]
        fn test_app_launches() {
            let device = MockDevice::new(PKG);
            device.set_settle_polls(2);
            assert!(run_phases(&AppLaunches, &device).is_ok());
        }

        #[test]
        fn test_app_not_in_foreground() {
            let device = MockDevice::new(PKG);
            device.set_foreground(LAUNCHER_PACKAGE);
            let err = run_phases(&AppLaunches, &device).unwrap_err();
            assert!(matches!(err, ProbeError::IdentityMismatch { .. }));
        }
    }

    mod permission_tests {
        use super::*;

        #[test]
        fn test_first_launch_grants_everything() {
            let device = first_launch_device();
            run_phases(&PermissionsRequest, &device).unwrap();
            assert_eq!(device.pending_prompts(), 0);
            assert_eq!(device.dismissed().len(), 3);
        }

        #[test]
        fn test_empty_screen_passes_with_zero_clicks() {
            let device = MockDevice::new(PKG);
            run_phases(&PermissionsRequest, &device).unwrap();
            assert!(device.taps().is_empty());
        }

        #[test]
        fn test_dependent_scenarios_grant_first() {
            let device = first_launch_device();
            run_phases(&HomeScreenDisplays, &device).unwrap();
            assert_eq!(device.pending_prompts(), 0);
        }

        #[test]
        fn test_home_screen_requires_app_in_foreground() {
            let device = MockDevice::new(PKG);
            device.set_foreground(LAUNCHER_PACKAGE);
            let err = run_phases(&HomeScreenDisplays, &device).unwrap_err();
            assert!(matches!(err, ProbeError::IdentityMismatch { .. }));
        }
    }

    mod settings_tests {
        use super::*;

        #[test]
        fn test_settings_present_is_clicked() {
            let device = MockDevice::new(PKG);
            let button = Bounds::new(900, 80, 1040, 200);
            device.set_screen(vec![
                UiNode::new("").with_description("Settings").with_bounds(button),
            ]);
            device.link(button, vec![UiNode::new("Notification preferences")]);

            run_phases(&NavigationToSettings, &device).unwrap();
            assert_eq!(device.taps(), vec![button.center()]);
        }

        #[test]
        fn test_korean_label() {
            let device = MockDevice::new(PKG);
            let button = Bounds::new(0, 0, 100, 100);
            device.set_screen(vec![UiNode::new("설정").with_bounds(button)]);
            run_phases(&NavigationToSettings, &device).unwrap();
            assert_eq!(device.taps().len(), 1);
        }

        #[test]
        fn test_settings_absent_passes() {
            let device = MockDevice::new(PKG);
            device.set_screen(vec![UiNode::new("Check in").with_bounds(Bounds::new(0, 0, 10, 10))]);
            run_phases(&NavigationToSettings, &device).unwrap();
            assert!(device.taps().is_empty());
        }

        #[test]
        fn test_settings_tap_that_kills_app_fails() {
            let device = MockDevice::new(PKG);
            let button = Bounds::new(900, 80, 1040, 200);
            device.set_screen(vec![UiNode::new("Settings").with_bounds(button)]);
            device.crash_on_tap(button);

            let err = run_phases(&NavigationToSettings, &device).unwrap_err();
            assert!(err.is_assertion());
            assert!(err.to_string().contains(LAUNCHER_PACKAGE));
        }

        #[test]
        fn test_tap_failure_errors() {
            let device = MockDevice::new(PKG);
            device.set_screen(vec![UiNode::new("Settings").with_bounds(Bounds::new(0, 0, 10, 10))]);
            device.fail_on(MockOp::Tap);
            let err = run_phases(&NavigationToSettings, &device).unwrap_err();
            assert!(!err.is_assertion());
        }
    }

    mod availability_tests {
        use super::*;

        #[test]
        fn test_location_and_camera() {
            let device = MockDevice::new(PKG);
            assert!(run_phases(&LocationServiceAvailable, &device).is_ok());
            assert!(run_phases(&CameraAvailable, &device).is_ok());
        }

        #[test]
        fn test_other_app_in_foreground() {
            let device = MockDevice::new(PKG);
            device.set_foreground("com.android.camera2");
            assert!(run_phases(&CameraAvailable, &device)
                .unwrap_err()
                .is_assertion());
        }
    }

    mod rotation_tests {
        use super::*;

        #[test]
        fn test_round_trip() {
            let device = MockDevice::new(PKG);
            run_phases(&SurvivesRotation, &device).unwrap();
            assert_eq!(device.orientation(), Orientation::Natural);
            assert!(device.was_called("set_orientation:left"));
            assert!(device.was_called("set_orientation:natural"));
        }

        #[test]
        fn test_crash_on_rotation_fails() {
            let device = MockDevice::new(PKG);
            device.set_crash_on_rotation(true);
            let err = run_phases(&SurvivesRotation, &device).unwrap_err();
            assert!(err.is_assertion());
            assert!(err.to_string().contains("left"));
        }

        #[test]
        fn test_rotation_error_is_environmental() {
            let device = MockDevice::new(PKG);
            device.fail_on(MockOp::Orientation);
            assert!(!run_phases(&SurvivesRotation, &device)
                .unwrap_err()
                .is_assertion());
        }
    }

    mod back_tests {
        use super::*;

        #[test]
        fn test_back_stays_on_target() {
            let device = MockDevice::new(PKG);
            run_phases(&BackButtonHandling, &device).unwrap();
            assert_eq!(device.foreground(), PKG);
        }

        #[test]
        fn test_back_exits_to_launcher() {
            let device = MockDevice::new(PKG);
            device.set_back_exits(true);
            run_phases(&BackButtonHandling, &device).unwrap();
            assert_eq!(device.foreground(), LAUNCHER_PACKAGE);
        }

        #[test]
        fn test_back_error_is_environmental() {
            let device = MockDevice::new(PKG);
            device.fail_on(MockOp::Back);
            assert!(!run_phases(&BackButtonHandling, &device)
                .unwrap_err()
                .is_assertion());
        }
    }
}
