//! Harness configuration.
//!
//! Loaded from `droidprobe.yaml`. Every field is optional; a missing file or
//! an empty document yields the built-in defaults.
//!
//! ```yaml
//! package: com.stickergaurdman
//! timeouts:
//!   idle_ms: 5000
//!   settle_ms: 1000
//!   prompt_ms: 1000
//!   poll_interval_ms: 250
//! permissions:
//!   order: [location, camera, notifications]
//!   patterns:
//!     camera: ["Autoriser"]
//! settings_labels: ["Settings", "설정"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::PERMISSION_CONTROLLER_PACKAGE;
use crate::locator::{ElementQuery, TextPattern};
use crate::permission::{PermissionCategory, PermissionFlowRunner, PromptPatterns};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{
    DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROMPT_TIMEOUT_MS,
    DEFAULT_SETTLE_TIMEOUT_MS,
};

/// Package exercised when nothing else is configured
pub const DEFAULT_PACKAGE: &str = "com.stickergaurdman";

/// File looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "droidprobe.yaml";

/// Bounded-wait durations, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Idle-wait before every scenario and after launches
    pub idle_ms: u64,
    /// Idle-wait after an interaction (click, rotation, back)
    pub settle_ms: u64,
    /// How long to look for each permission prompt
    pub prompt_ms: u64,
    /// Polling interval for idle-waits and element lookups
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            idle_ms: DEFAULT_IDLE_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_TIMEOUT_MS,
            prompt_ms: DEFAULT_PROMPT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Timeouts {
    /// Idle timeout
    #[must_use]
    pub const fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    /// Settle timeout
    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Prompt lookup timeout
    #[must_use]
    pub const fn prompt(&self) -> Duration {
        Duration::from_millis(self.prompt_ms)
    }
}

/// Permission flow settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Categories to walk, in order
    pub order: Vec<PermissionCategory>,
    /// Extra allow labels, merged into the built-in ones
    pub patterns: PromptPatterns,
    /// Use `patterns` alone instead of merging
    pub replace_defaults: bool,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            order: PermissionCategory::DEFAULT_ORDER.to_vec(),
            patterns: PromptPatterns::empty(),
            replace_defaults: false,
        }
    }
}

impl PermissionConfig {
    /// Effective label table
    #[must_use]
    pub fn effective_patterns(&self) -> PromptPatterns {
        if self.replace_defaults {
            return self.patterns.clone();
        }
        let mut patterns = PromptPatterns::default();
        patterns.merge(&self.patterns);
        patterns
    }
}

/// Top-level harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Package identifier of the app under test
    pub package: String,
    /// Device serial passed to `adb -s`; `None` lets adb pick
    pub serial: Option<String>,
    /// Path to the `adb` binary
    pub adb: PathBuf,
    /// Packages allowed to cover the target when a scenario starts
    pub overlay_packages: Vec<String>,
    /// Wait durations
    pub timeouts: Timeouts,
    /// Permission flow settings
    pub permissions: PermissionConfig,
    /// Labels identifying the settings affordance
    pub settings_labels: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            package: DEFAULT_PACKAGE.to_string(),
            serial: None,
            adb: PathBuf::from("adb"),
            overlay_packages: vec![
                PERMISSION_CONTROLLER_PACKAGE.to_string(),
                "com.google.android.permissioncontroller".to_string(),
            ],
            timeouts: Timeouts::default(),
            permissions: PermissionConfig::default(),
            settings_labels: vec!["Settings".to_string(), "설정".to_string()],
        }
    }
}

impl HarnessConfig {
    /// Defaults targeting `package`
    #[must_use]
    pub fn for_package(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Parse a YAML document and validate it
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!(path = %path.display(), package = %config.package, "configuration loaded");
        Ok(config)
    }

    /// Load `explicit` if given, else `droidprobe.yaml` in `dir` if present,
    /// else the defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> ProbeResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check the values are usable
    pub fn validate(&self) -> ProbeResult<()> {
        if self.package.trim().is_empty() {
            return Err(ProbeError::config("package must not be empty"));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(ProbeError::config("timeouts.poll_interval_ms must be positive"));
        }
        let patterns = self.permissions.effective_patterns();
        for category in &self.permissions.order {
            if patterns.labels(*category).is_empty() {
                return Err(ProbeError::config(format!(
                    "permission category '{category}' is in the order but has no labels"
                )));
            }
        }
        if self.settings_labels.iter().all(|l| l.trim().is_empty()) {
            return Err(ProbeError::config("settings_labels must contain a label"));
        }
        Ok(())
    }

    /// Permission runner configured from these settings
    #[must_use]
    pub fn permission_runner(&self) -> PermissionFlowRunner {
        PermissionFlowRunner::new(self.permissions.effective_patterns())
            .with_order(self.permissions.order.clone())
            .with_prompt_timeout(self.timeouts.prompt())
            .with_settle_timeout(self.timeouts.settle())
    }

    /// Query for the settings affordance: description or text containing
    /// any of the settings labels
    #[must_use]
    pub fn settings_query(&self) -> ElementQuery {
        ElementQuery::description(TextPattern::contains_any(&self.settings_labels))
            .or(ElementQuery::text(TextPattern::contains_any(&self.settings_labels)))
    }

    /// Whether `package` may cover the target at scenario start
    #[must_use]
    pub fn is_overlay(&self, package: &str) -> bool {
        self.overlay_packages.iter().any(|p| p == package)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::UiNode;
    use std::io::Write;

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_default_values() {
            let config = HarnessConfig::default();
            assert_eq!(config.package, DEFAULT_PACKAGE);
            assert_eq!(config.timeouts.idle(), Duration::from_millis(5000));
            assert_eq!(config.timeouts.settle(), Duration::from_millis(1000));
            assert_eq!(config.timeouts.prompt(), Duration::from_millis(1000));
            assert_eq!(config.timeouts.poll_interval_ms, 250);
            assert_eq!(config.permissions.order.len(), 3);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_for_package() {
            let config = HarnessConfig::for_package("org.example.app");
            assert_eq!(config.package, "org.example.app");
            assert_eq!(config.timeouts, Timeouts::default());
        }

        #[test]
        fn test_overlay() {
            let config = HarnessConfig::default();
            assert!(config.is_overlay(PERMISSION_CONTROLLER_PACKAGE));
            assert!(!config.is_overlay("com.android.launcher3"));
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_empty_document() {
            assert_eq!(HarnessConfig::from_yaml_str("").unwrap(), HarnessConfig::default());
        }

        #[test]
        fn test_partial_document() {
            let config = HarnessConfig::from_yaml_str(
                "package: org.example.app\ntimeouts:\n  idle_ms: 8000\n",
            )
            .unwrap();
            assert_eq!(config.package, "org.example.app");
            assert_eq!(config.timeouts.idle_ms, 8000);
            assert_eq!(config.timeouts.settle_ms, DEFAULT_SETTLE_TIMEOUT_MS);
            assert_eq!(config.settings_labels, vec!["Settings", "설정"]);
        }

        #[test]
        fn test_patterns_merge_with_defaults() {
            let config = HarnessConfig::from_yaml_str(
                "permissions:\n  patterns:\n    camera: [Autoriser]\n",
            )
            .unwrap();
            let patterns = config.permissions.effective_patterns();
            let camera = patterns.labels(PermissionCategory::Camera);
            assert!(camera.contains(&"Autoriser".to_string()));
            assert!(camera.contains(&"Allow".to_string()));
        }

        #[test]
        fn test_patterns_replace_defaults() {
            let config = HarnessConfig::from_yaml_str(
                "permissions:\n  order: [camera]\n  replace_defaults: true\n  patterns:\n    camera: [Autoriser]\n",
            )
            .unwrap();
            let patterns = config.permissions.effective_patterns();
            assert_eq!(patterns.labels(PermissionCategory::Camera), ["Autoriser"]);
            assert!(patterns.labels(PermissionCategory::Location).is_empty());
        }

        #[test]
        fn test_unknown_category_rejected() {
            let err = HarnessConfig::from_yaml_str("permissions:\n  order: [microphone]\n")
                .unwrap_err();
            assert!(matches!(err, ProbeError::Yaml(_)));
        }

        #[test]
        fn test_round_trip() {
            let config = HarnessConfig::for_package("org.example.app");
            let yaml = config.to_yaml().unwrap();
            assert_eq!(HarnessConfig::from_yaml_str(&yaml).unwrap(), config);
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_empty_package() {
            let err = HarnessConfig::from_yaml_str("package: \"  \"\n").unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }

        #[test]
        fn test_zero_poll_interval() {
            let err =
                HarnessConfig::from_yaml_str("timeouts:\n  poll_interval_ms: 0\n").unwrap_err();
            assert!(err.to_string().contains("poll_interval_ms"));
        }

        #[test]
        fn test_category_without_labels() {
            let err = HarnessConfig::from_yaml_str(
                "permissions:\n  replace_defaults: true\n  order: [location]\n",
            )
            .unwrap_err();
            assert!(err.to_string().contains("location"));
        }

        #[test]
        fn test_blank_settings_labels() {
            let err = HarnessConfig::from_yaml_str("settings_labels: [\"\"]\n").unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_load_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "package: org.example.file").unwrap();
            let config = HarnessConfig::load(file.path()).unwrap();
            assert_eq!(config.package, "org.example.file");
        }

        #[test]
        fn test_load_missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let err = HarnessConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }

        #[test]
        fn test_discover_in_directory() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "package: org.example.dir\n")
                .unwrap();
            let config = HarnessConfig::discover(None, dir.path()).unwrap();
            assert_eq!(config.package, "org.example.dir");
        }

        #[test]
        fn test_discover_falls_back_to_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let config = HarnessConfig::discover(None, dir.path()).unwrap();
            assert_eq!(config, HarnessConfig::default());
        }

        #[test]
        fn test_discover_explicit_wins() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "package: org.example.dir\n")
                .unwrap();
            let explicit = dir.path().join("other.yaml");
            std::fs::write(&explicit, "package: org.example.explicit\n").unwrap();
            let config = HarnessConfig::discover(Some(&explicit), dir.path()).unwrap();
            assert_eq!(config.package, "org.example.explicit");
        }
    }

    mod derived_tests {
        use super::*;

        #[test]
        fn test_settings_query() {
            let query = HarnessConfig::default().settings_query();
            assert!(query.matches(&UiNode::new("").with_description("Open Settings")));
            assert!(query.matches(&UiNode::new("App settings")));
            assert!(query.matches(&UiNode::new("설정")));
            assert!(!query.matches(&UiNode::new("Statistics")));
        }

        #[test]
        fn test_permission_runner_uses_config() {
            let config = HarnessConfig::from_yaml_str(
                "timeouts:\n  prompt_ms: 10\npermissions:\n  order: [notifications]\n",
            )
            .unwrap();
            let runner = config.permission_runner();
            assert_eq!(runner.order(), [PermissionCategory::Notifications]);
        }
    }
}
