//! Scenario runner.
//!
//! Runs scenarios one at a time against the run's single device:
//!
//! 1. `NotStarted -> Running`
//! 2. best-effort wake
//! 3. idle-wait
//! 4. identity precondition (target, or a permission dialog covering it)
//! 5. `setup`, `action`, `verify`
//! 6. `Running -> Passed | Failed | Errored`
//! 7. baseline restore (natural orientation, target in foreground)
//!
//! There are no retries. A restore failure is logged and leaves the verdict
//! untouched.

use std::time::Instant;

use crate::config::HarnessConfig;
use crate::driver::DeviceController;
use crate::reporter::{FailureMode, RunReport, ScenarioReport};
use crate::result::{ProbeError, ProbeResult};
use crate::scenario::{Scenario, ScenarioExecution, Session, Verdict};
use crate::scenarios::standard_suite;

/// Executes a list of scenarios and aggregates their verdicts
#[derive(Debug)]
pub struct ScenarioRunner {
    config: HarnessConfig,
    scenarios: Vec<Box<dyn Scenario>>,
    filter: Option<String>,
    failure_mode: FailureMode,
}

impl ScenarioRunner {
    /// Runner over the standard suite
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_scenarios(config, standard_suite())
    }

    /// Runner over custom scenarios
    #[must_use]
    pub fn with_scenarios(config: HarnessConfig, scenarios: Vec<Box<dyn Scenario>>) -> Self {
        Self {
            config,
            scenarios,
            filter: None,
            failure_mode: FailureMode::CollectAll,
        }
    }

    /// Only run scenarios whose name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.is_empty());
        self
    }

    /// Stop after the first scenario that does not pass
    #[must_use]
    pub const fn fail_fast(mut self, enabled: bool) -> Self {
        self.failure_mode = if enabled {
            FailureMode::AndonCord
        } else {
            FailureMode::CollectAll
        };
        self
    }

    /// Configuration in effect
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Scenarios selected by the filter, in declaration order
    #[must_use]
    pub fn selected(&self) -> Vec<&dyn Scenario> {
        self.scenarios
            .iter()
            .map(|s| &**s)
            .filter(|s| {
                self.filter
                    .as_deref()
                    .map_or(true, |f| s.name().contains(f))
            })
            .collect()
    }

    /// Run every selected scenario.
    ///
    /// Fails only when the filter selects nothing; scenario outcomes are
    /// verdicts in the report, never errors.
    pub fn run(&self, controller: &mut DeviceController) -> ProbeResult<RunReport> {
        let selected = self.selected();
        if selected.is_empty() {
            return Err(ProbeError::config(format!(
                "no scenario matches filter '{}'",
                self.filter.as_deref().unwrap_or_default()
            )));
        }

        let start = Instant::now();
        let mut report = RunReport::new(&self.config.package, controller.description())
            .with_failure_mode(self.failure_mode);
        tracing::info!(
            package = %self.config.package,
            device = %report.device,
            scenarios = selected.len(),
            "starting run"
        );

        for scenario in selected {
            let entry = self.run_scenario(controller, scenario);
            if report.record(entry).is_break() {
                break;
            }
        }

        report.finish(start.elapsed());
        tracing::info!(summary = %report.summary(), "run finished");
        Ok(report)
    }

    /// Run one scenario through its full lifecycle
    pub fn run_scenario(
        &self,
        controller: &mut DeviceController,
        scenario: &dyn Scenario,
    ) -> ScenarioReport {
        let start = Instant::now();
        let mut execution = ScenarioExecution::new(scenario.name());
        tracing::info!(scenario = scenario.name(), "scenario started");

        let started = execution.start();
        let wake = controller.wake();
        let mut start_overlay = None;
        let outcome =
            started.and_then(|()| self.drive(controller, scenario, &mut start_overlay));

        let verdict = Verdict::from_outcome(&outcome);
        if let Err(err) = execution.finish(verdict.clone()) {
            tracing::error!(scenario = scenario.name(), error = %err, "verdict not recorded");
        }
        match &verdict {
            Verdict::Passed => tracing::info!(scenario = scenario.name(), "passed"),
            Verdict::Failed { reason } => {
                tracing::warn!(scenario = scenario.name(), %reason, "failed");
            }
            Verdict::Errored { reason } => {
                tracing::warn!(scenario = scenario.name(), %reason, "errored");
            }
        }

        let baseline_restored = match controller
            .restore_baseline(&self.config.package, self.config.timeouts.settle())
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(scenario = scenario.name(), error = %err, "baseline restore failed");
                false
            }
        };

        ScenarioReport {
            name: scenario.name().to_string(),
            description: scenario.description().to_string(),
            verdict,
            wake,
            duration_ms: start.elapsed().as_millis() as u64,
            baseline_restored,
            start_overlay,
        }
    }

    fn drive(
        &self,
        controller: &mut DeviceController,
        scenario: &dyn Scenario,
        start_overlay: &mut Option<String>,
    ) -> ProbeResult<()> {
        let mut session = Session::new(controller, &self.config);
        session.wait_for_idle()?;
        *start_overlay = session.expect_identity_or_overlay()?;
        scenario.setup(&mut session)?;
        scenario.action(&mut session)?;
        scenario.verify(&mut session)
    }
}
