//! Droidprobe: Device-Driven E2E Harness for Android Apps
//!
//! Exercises an installed app through the device's accessibility surface:
//! launch, the runtime permission flow, navigation, rotation and back
//! handling, asserting observable invariants after each interaction.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    DROIDPROBE Architecture                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Session    │    │ Device     │            │
//! │   │ Runner     │───►│ locator +  │───►│ Controller │──► adb     │
//! │   │            │    │ permissions│    │            │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                                                       │
//! │         ▼                                                       │
//! │   ┌────────────┐                                                │
//! │   │ RunReport  │  text · JSON · JUnit                           │
//! │   └────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use droidprobe::{DeviceController, HarnessConfig, MockDevice, ScenarioRunner};
//!
//! let device = MockDevice::new("com.stickergaurdman");
//! let mut controller = DeviceController::new(device).with_poll_interval(5);
//!
//! let mut config = HarnessConfig::default();
//! config.timeouts.idle_ms = 20;
//! config.timeouts.settle_ms = 20;
//! config.timeouts.prompt_ms = 20;
//!
//! let runner = ScenarioRunner::new(config).with_filter(Some("rotation".into()));
//! let report = runner.run(&mut controller).unwrap();
//! assert!(report.all_passed());
//! ```

#![warn(missing_docs)]

#[cfg(feature = "adb")]
mod adb;
mod assertion;
mod config;
mod driver;
mod locator;
mod permission;
mod reporter;
mod result;
mod runner;
mod scenario;
mod wait;

/// Built-in scenarios
pub mod scenarios;

/// Scriptable in-memory device for tests and dry runs
pub mod mock;

#[cfg(feature = "adb")]
pub use adb::{AdbDevice, DumpParser};
pub use assertion::{Assertion, AssertionResult};
pub use config::{
    HarnessConfig, PermissionConfig, Timeouts, DEFAULT_CONFIG_FILE, DEFAULT_PACKAGE,
};
pub use driver::{
    Bounds, DeviceController, DeviceDriver, IdleOutcome, Orientation, Point, UiNode, WakeOutcome,
    LAUNCHER_PACKAGE, PERMISSION_CONTROLLER_PACKAGE,
};
pub use locator::{ElementHandle, ElementQuery, ObjectLocator, TextPattern};
pub use mock::{MockDevice, MockOp};
pub use permission::{
    PermissionCategory, PermissionFlowReport, PermissionFlowRunner, PromptOutcome, PromptPatterns,
    PromptRecord,
};
pub use reporter::{FailureMode, RunReport, ScenarioReport};
pub use result::{ProbeError, ProbeResult};
pub use runner::ScenarioRunner;
pub use scenario::{Scenario, ScenarioExecution, ScenarioState, Session, Verdict};
pub use scenarios::standard_suite;
pub use wait::{
    Polled, WaitOptions, WaitResult, Waiter, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_PROMPT_TIMEOUT_MS, DEFAULT_SETTLE_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "adb")]
    pub use super::adb::*;
    pub use super::assertion::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::locator::*;
    pub use super::mock::*;
    pub use super::permission::*;
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::scenario::*;
    pub use super::scenarios::*;
    pub use super::wait::*;
}
