//! Reporter - Run Reports with Andon Cord Support
//!
//! Collects one [`ScenarioReport`] per executed scenario and renders the
//! run as a summary line, JSON or JUnit XML. Reports are rendered to
//! strings only; the CLI decides where they go.
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │  FailureMode::CollectAll │     │  FailureMode::AndonCord  │
//! │  run every scenario      │     │  stop after the first    │
//! │  (default)               │     │  non-passing verdict     │
//! └──────────────────────────┘     └──────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::time::Duration;

use crate::driver::WakeOutcome;
use crate::result::ProbeResult;
use crate::scenario::{ScenarioState, Verdict};

/// What to do after a scenario does not pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Run every selected scenario
    #[default]
    CollectAll,
    /// Stop the line on the first Failed or Errored verdict
    AndonCord,
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Scenario summary
    pub description: String,
    /// Final verdict
    #[serde(flatten)]
    pub verdict: Verdict,
    /// Result of the best-effort wake before the scenario
    pub wake: WakeOutcome,
    /// Wall-clock time of the scenario, in milliseconds
    pub duration_ms: u64,
    /// Whether the device was put back into the baseline afterwards
    pub baseline_restored: bool,
    /// Overlay package accepted in place of the target when the scenario
    /// started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_overlay: Option<String>,
}

impl ScenarioReport {
    /// Report for `name` with `verdict`; awake, zero duration, baseline restored
    #[must_use]
    pub fn new(name: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            verdict,
            wake: WakeOutcome::Awake,
            duration_ms: 0,
            baseline_restored: true,
            start_overlay: None,
        }
    }

    /// Terminal state of the scenario
    #[must_use]
    pub const fn state(&self) -> ScenarioState {
        self.verdict.state()
    }

    /// Duration as [`Duration`]
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Aggregated result of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Package under test
    pub package: String,
    /// Device description
    pub device: String,
    /// Per-scenario outcomes, in execution order
    pub scenarios: Vec<ScenarioReport>,
    /// Wall-clock time of the whole run, in milliseconds
    pub duration_ms: u64,
    #[serde(skip)]
    failure_mode: FailureMode,
}

impl RunReport {
    /// Empty report for a run against `package` on `device`
    #[must_use]
    pub fn new(package: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            device: device.into(),
            ..Self::default()
        }
    }

    /// Set the failure mode
    #[must_use]
    pub const fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Failure mode in effect
    #[must_use]
    pub const fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    /// Record a scenario outcome.
    ///
    /// Returns `Break` when the Andon Cord is pulled and the run should stop.
    pub fn record(&mut self, entry: ScenarioReport) -> ControlFlow<()> {
        let passed = entry.verdict.is_passed();
        let name = entry.name.clone();
        self.scenarios.push(entry);

        if !passed && self.failure_mode == FailureMode::AndonCord {
            tracing::warn!(scenario = %name, "andon cord pulled, stopping run");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    /// Record total run time
    pub fn finish(&mut self, elapsed: Duration) {
        self.duration_ms = elapsed.as_millis() as u64;
    }

    fn count(&self, state: ScenarioState) -> usize {
        self.scenarios.iter().filter(|s| s.state() == state).count()
    }

    /// Scenarios that passed
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(ScenarioState::Passed)
    }

    /// Scenarios that failed an assertion
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(ScenarioState::Failed)
    }

    /// Scenarios that hit an environment error
    #[must_use]
    pub fn errored_count(&self) -> usize {
        self.count(ScenarioState::Errored)
    }

    /// Scenarios executed
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.scenarios.len()
    }

    /// True iff nothing Failed or Errored
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.scenarios.iter().all(|s| s.verdict.is_passed())
    }

    /// Pass rate (0.0 to 1.0); an empty run counts as fully passing
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.scenarios.is_empty() {
            return 1.0;
        }
        self.passed_count() as f64 / self.scenarios.len() as f64
    }

    /// Scenarios that did not pass
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios
            .iter()
            .filter(|s| !s.verdict.is_passed())
            .collect()
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed, {} failed, {} errored ({:.1}%)",
            self.package,
            self.passed_count(),
            self.total_count(),
            self.failed_count(),
            self.errored_count(),
            self.pass_rate() * 100.0
        )
    }

    /// Pretty JSON
    pub fn to_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JUnit XML for CI consumption
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" time="{:.3}">"#,
            escape_xml(&self.package),
            self.total_count(),
            self.failed_count(),
            self.errored_count(),
            Duration::from_millis(self.duration_ms).as_secs_f64()
        ));
        xml.push('\n');

        for scenario in &self.scenarios {
            xml.push_str(&format!(
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&scenario.name),
                scenario.duration().as_secs_f64()
            ));
            xml.push('\n');

            match &scenario.verdict {
                Verdict::Passed => {}
                Verdict::Failed { reason } => {
                    xml.push_str(&format!(
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(reason),
                        escape_xml(reason)
                    ));
                    xml.push('\n');
                }
                Verdict::Errored { reason } => {
                    xml.push_str(&format!(
                        r#"    <error message="{}">{}</error>"#,
                        escape_xml(reason),
                        escape_xml(reason)
                    ));
                    xml.push('\n');
                }
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
