//! Permission prompt dismissal.
//!
//! Runtime permission dialogs are answered by looking for an "allow"
//! affordance per permission category. The labels that count as "allow" live
//! in [`PromptPatterns`], keyed by category, so supporting another locale or
//! OS wording is a data change only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::driver::DeviceController;
use crate::locator::{ElementQuery, ObjectLocator, TextPattern};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{DEFAULT_PROMPT_TIMEOUT_MS, DEFAULT_SETTLE_TIMEOUT_MS};

/// Runtime permission requested by the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    /// Fine/coarse location
    Location,
    /// Location while the app is in the background
    BackgroundLocation,
    /// Camera
    Camera,
    /// Post notifications (Android 13+)
    Notifications,
}

impl PermissionCategory {
    /// Every category
    pub const ALL: [Self; 4] = [
        Self::Location,
        Self::BackgroundLocation,
        Self::Camera,
        Self::Notifications,
    ];

    /// Order in which the app asks on first launch
    pub const DEFAULT_ORDER: [Self; 3] = [Self::Location, Self::Camera, Self::Notifications];

    /// Stable name used in config files and reports
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::BackgroundLocation => "background_location",
            Self::Camera => "camera",
            Self::Notifications => "notifications",
        }
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionCategory {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ProbeError::config(format!("unknown permission category '{s}'")))
    }
}

/// Labels of the "allow" affordance, per permission category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptPatterns {
    labels: BTreeMap<PermissionCategory, Vec<String>>,
}

impl Default for PromptPatterns {
    fn default() -> Self {
        const FOREGROUND: [&str; 6] = [
            "Allow",
            "While using the app",
            "Only this time",
            "허용",
            "앱 사용 중에만 허용",
            "이번만 허용",
        ];
        Self::empty()
            .with(PermissionCategory::Location, FOREGROUND)
            .with(
                PermissionCategory::BackgroundLocation,
                ["Allow all the time", "Allow", "항상 허용", "허용"],
            )
            .with(PermissionCategory::Camera, FOREGROUND)
            .with(PermissionCategory::Notifications, ["Allow", "허용"])
    }
}

impl PromptPatterns {
    /// Table with no labels at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            labels: BTreeMap::new(),
        }
    }

    /// Replace the labels of `category`
    #[must_use]
    pub fn with<I, S>(mut self, category: PermissionCategory, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels
            .insert(category, labels.into_iter().map(Into::into).collect());
        self
    }

    /// Add labels to `category`, keeping the existing ones
    pub fn extend<I, S>(&mut self, category: PermissionCategory, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.labels.entry(category).or_default();
        for label in labels {
            let label = label.into();
            if !entry.contains(&label) {
                entry.push(label);
            }
        }
    }

    /// Merge another table into this one
    pub fn merge(&mut self, other: &Self) {
        for (category, labels) in &other.labels {
            self.extend(*category, labels.iter().cloned());
        }
    }

    /// Labels for `category`
    #[must_use]
    pub fn labels(&self, category: PermissionCategory) -> &[String] {
        self.labels.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Categories that have labels
    pub fn categories(&self) -> impl Iterator<Item = PermissionCategory> + '_ {
        self.labels.keys().copied()
    }

    /// Query matching the allow affordance of `category`
    #[must_use]
    pub fn query(&self, category: PermissionCategory) -> ElementQuery {
        ElementQuery::text(TextPattern::one_of(self.labels(category)))
    }
}

/// What happened for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PromptOutcome {
    /// A prompt was shown and its allow button clicked
    Dismissed {
        /// Text of the clicked button
        label: String,
    },
    /// No prompt appeared: already granted, or not asked on this OS version
    NotPresented,
}

/// Outcome for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    /// Category handled
    pub category: PermissionCategory,
    /// What happened
    #[serde(flatten)]
    pub outcome: PromptOutcome,
}

/// Result of one pass over the permission sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlowReport {
    /// Per-category outcomes, in run order
    pub records: Vec<PromptRecord>,
}

impl PermissionFlowReport {
    /// Number of prompts clicked
    #[must_use]
    pub fn clicks(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, PromptOutcome::Dismissed { .. }))
            .count()
    }

    /// Categories whose prompt was clicked
    #[must_use]
    pub fn dismissed(&self) -> Vec<PermissionCategory> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, PromptOutcome::Dismissed { .. }))
            .map(|r| r.category)
            .collect()
    }
}

/// Walks the permission categories and clicks every "allow" prompt found
#[derive(Debug, Clone)]
pub struct PermissionFlowRunner {
    patterns: PromptPatterns,
    order: Vec<PermissionCategory>,
    prompt_timeout: Duration,
    settle_timeout: Duration,
}

impl Default for PermissionFlowRunner {
    fn default() -> Self {
        Self::new(PromptPatterns::default())
    }
}

impl PermissionFlowRunner {
    /// Runner over `patterns` with the default order and timeouts
    #[must_use]
    pub fn new(patterns: PromptPatterns) -> Self {
        Self {
            patterns,
            order: PermissionCategory::DEFAULT_ORDER.to_vec(),
            prompt_timeout: Duration::from_millis(DEFAULT_PROMPT_TIMEOUT_MS),
            settle_timeout: Duration::from_millis(DEFAULT_SETTLE_TIMEOUT_MS),
        }
    }

    /// Set the category order
    #[must_use]
    pub fn with_order(mut self, order: Vec<PermissionCategory>) -> Self {
        self.order = order;
        self
    }

    /// Set how long to look for each prompt
    #[must_use]
    pub const fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// Set how long to let the UI settle after a click
    #[must_use]
    pub const fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Label table in use
    #[must_use]
    pub const fn patterns(&self) -> &PromptPatterns {
        &self.patterns
    }

    /// Category order in use
    #[must_use]
    pub fn order(&self) -> &[PermissionCategory] {
        &self.order
    }

    /// Run the sequence once.
    ///
    /// Idempotent: once every prompt is answered, another run clicks nothing.
    /// A prompt that vanishes between lookup and click counts as not presented.
    pub fn run(&self, controller: &mut DeviceController) -> ProbeResult<PermissionFlowReport> {
        let locator = ObjectLocator::for_controller(controller);
        let mut report = PermissionFlowReport::default();

        for &category in &self.order {
            let query = self.patterns.query(category);
            let outcome = match locator.find(controller, &query, self.prompt_timeout)? {
                Some(handle) => {
                    let label = handle.node().text.clone();
                    match locator.click(controller, handle) {
                        Ok(()) => {
                            controller.wait_for_idle(self.settle_timeout)?;
                            tracing::info!(%category, %label, "permission prompt dismissed");
                            PromptOutcome::Dismissed { label }
                        }
                        Err(ProbeError::ElementNotFound { .. }) => {
                            tracing::debug!(%category, "prompt vanished before click");
                            PromptOutcome::NotPresented
                        }
                        Err(err) => return Err(err),
                    }
                }
                None => {
                    tracing::debug!(%category, "no permission prompt");
                    PromptOutcome::NotPresented
                }
            };
            report.records.push(PromptRecord { category, outcome });
        }

        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDevice, MockOp};

    const PKG: &str = "app.example.guard";

    fn fast_runner() -> PermissionFlowRunner {
        PermissionFlowRunner::default()
            .with_prompt_timeout(Duration::from_millis(30))
            .with_settle_timeout(Duration::from_millis(30))
    }

    fn controller(device: &MockDevice) -> DeviceController {
        DeviceController::new(device.clone()).with_poll_interval(5)
    }

    mod category_tests {
        use super::*;

        #[test]
        fn test_round_trip_names() {
            for category in PermissionCategory::ALL {
                assert_eq!(category.as_str().parse::<PermissionCategory>().unwrap(), category);
            }
        }

        #[test]
        fn test_unknown_name() {
            assert!("microphone".parse::<PermissionCategory>().is_err());
        }

        #[test]
        fn test_default_order() {
            assert_eq!(
                PermissionCategory::DEFAULT_ORDER,
                [
                    PermissionCategory::Location,
                    PermissionCategory::Camera,
                    PermissionCategory::Notifications
                ]
            );
        }
    }

    mod patterns_tests {
        use super::*;

        #[test]
        fn test_defaults_cover_english_and_korean() {
            let patterns = PromptPatterns::default();
            for category in PermissionCategory::ALL {
                let labels = patterns.labels(category);
                assert!(labels.iter().any(|l| l == "Allow"), "{category}");
                assert!(labels.iter().any(|l| l == "허용"), "{category}");
            }
        }

        #[test]
        fn test_query_matches_localized_label() {
            let q = PromptPatterns::default().query(PermissionCategory::Camera);
            assert!(q.matches(&crate::UiNode::new("앱 사용 중에만 허용")));
            assert!(q.matches(&crate::UiNode::new("WHILE USING THE APP")));
            assert!(!q.matches(&crate::UiNode::new("Don't allow")));
        }

        #[test]
        fn test_missing_category_matches_nothing() {
            let q = PromptPatterns::empty().query(PermissionCategory::Location);
            assert!(!q.matches(&crate::UiNode::new("Allow")));
        }

        #[test]
        fn test_extend_deduplicates() {
            let mut patterns = PromptPatterns::empty().with(PermissionCategory::Camera, ["Allow"]);
            patterns.extend(PermissionCategory::Camera, ["Allow", "Autoriser"]);
            assert_eq!(patterns.labels(PermissionCategory::Camera), ["Allow", "Autoriser"]);
        }

        #[test]
        fn test_merge() {
            let mut base = PromptPatterns::default();
            let extra = PromptPatterns::empty()
                .with(PermissionCategory::Notifications, ["Zulassen"]);
            base.merge(&extra);
            assert!(base
                .labels(PermissionCategory::Notifications)
                .contains(&"Zulassen".to_string()));
            assert!(base
                .labels(PermissionCategory::Notifications)
                .contains(&"Allow".to_string()));
        }

        #[test]
        fn test_yaml_shape() {
            let yaml = "camera: [Allow, 허용]\nnotifications: [Allow]\n";
            let patterns: PromptPatterns = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(patterns.labels(PermissionCategory::Camera), ["Allow", "허용"]);
            assert_eq!(patterns.categories().count(), 2);
        }
    }

    mod runner_tests {
        use super::*;

        #[test]
        fn test_no_prompts_zero_clicks() {
            let device = MockDevice::new(PKG);
            let mut ctl = controller(&device);
            let report = fast_runner().run(&mut ctl).unwrap();
            assert_eq!(report.clicks(), 0);
            assert_eq!(report.records.len(), 3);
            assert!(device.taps().is_empty());
        }

        #[test]
        fn test_dismisses_each_prompt_in_order() {
            let device = MockDevice::new(PKG);
            device.push_prompt(MockDevice::permission_prompt("Location?", "While using the app"));
            device.push_prompt(MockDevice::permission_prompt("카메라?", "허용"));
            device.push_prompt(MockDevice::permission_prompt("Notifications?", "Allow"));
            let mut ctl = controller(&device);

            let report = fast_runner().run(&mut ctl).unwrap();
            assert_eq!(report.clicks(), 3);
            assert_eq!(
                report.dismissed(),
                PermissionCategory::DEFAULT_ORDER.to_vec()
            );
            assert_eq!(device.pending_prompts(), 0);
            assert_eq!(
                device.dismissed(),
                vec!["While using the app", "허용", "Allow"]
            );
        }

        #[test]
        fn test_partial_prompts() {
            let device = MockDevice::new(PKG);
            device.push_prompt(MockDevice::permission_prompt("Notifications?", "Allow"));
            let mut ctl = controller(&device);

            let report = fast_runner().run(&mut ctl).unwrap();
            assert_eq!(report.clicks(), 1);
            assert_eq!(device.pending_prompts(), 0);
        }

        #[test]
        fn test_second_run_is_idempotent() {
            let device = MockDevice::new(PKG);
            device.push_prompt(MockDevice::permission_prompt("Location?", "Allow"));
            device.push_prompt(MockDevice::permission_prompt("Camera?", "Allow"));
            let mut ctl = controller(&device);
            let runner = fast_runner();

            assert_eq!(runner.run(&mut ctl).unwrap().clicks(), 2);
            let taps_after_first = device.taps().len();

            let second = runner.run(&mut ctl).unwrap();
            assert_eq!(second.clicks(), 0);
            assert_eq!(device.taps().len(), taps_after_first);
        }

        #[test]
        fn test_custom_order_and_patterns() {
            let device = MockDevice::new(PKG);
            device.push_prompt(MockDevice::permission_prompt("Toujours?", "Autoriser"));
            let mut ctl = controller(&device);
            let runner = PermissionFlowRunner::new(
                PromptPatterns::empty().with(PermissionCategory::BackgroundLocation, ["autoriser"]),
            )
            .with_order(vec![PermissionCategory::BackgroundLocation])
            .with_prompt_timeout(Duration::from_millis(30))
            .with_settle_timeout(Duration::from_millis(30));

            let report = runner.run(&mut ctl).unwrap();
            assert_eq!(report.dismissed(), vec![PermissionCategory::BackgroundLocation]);
        }

        #[test]
        fn test_device_error_propagates() {
            let device = MockDevice::new(PKG);
            device.fail_on(MockOp::Dump);
            let mut ctl = controller(&device);
            let err = fast_runner().run(&mut ctl).unwrap_err();
            assert!(!err.is_assertion());
        }

        #[test]
        fn test_tap_error_propagates() {
            let device = MockDevice::new(PKG);
            device.push_prompt(MockDevice::permission_prompt("Location?", "Allow"));
            device.fail_on(MockOp::Tap);
            let mut ctl = controller(&device);
            let err = fast_runner().run(&mut ctl).unwrap_err();
            assert!(matches!(err, ProbeError::Automation { .. }));
        }

        #[test]
        fn test_report_serializes() {
            let report = PermissionFlowReport {
                records: vec![
                    PromptRecord {
                        category: PermissionCategory::Camera,
                        outcome: PromptOutcome::Dismissed {
                            label: "Allow".into(),
                        },
                    },
                    PromptRecord {
                        category: PermissionCategory::Notifications,
                        outcome: PromptOutcome::NotPresented,
                    },
                ],
            };
            let json = serde_json::to_value(&report).unwrap();
            assert_eq!(json["records"][0]["category"], "camera");
            assert_eq!(json["records"][0]["outcome"], "dismissed");
            assert_eq!(json["records"][1]["outcome"], "not_presented");
        }
    }
}
