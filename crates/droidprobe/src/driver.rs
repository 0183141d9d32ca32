//! DeviceDriver - Abstract Device Automation Trait
//!
//! The harness never talks to a device directly. Everything it needs from the
//! automation surface goes through the narrow [`DeviceDriver`] trait, and
//! [`DeviceController`] layers the harness semantics on top of it:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  DeviceController                                                │
//! │  best-effort wake · bounded idle-wait · UI generation tracking   │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  DeviceDriver (trait)                                            │
//! │  ┌──────────────────────┐        ┌──────────────────────┐        │
//! │  │  AdbDevice           │        │  MockDevice          │        │
//! │  │  `adb shell ...`     │        │  scripted, in-memory │        │
//! │  └──────────────────────┘        └──────────────────────┘        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use crate::result::ProbeResult;
use crate::wait::{WaitOptions, Waiter, DEFAULT_POLL_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default home-screen package; where the app goes when it exits
pub const LAUNCHER_PACKAGE: &str = "com.android.launcher3";

/// Package owning system permission dialogs
pub const PERMISSION_CONTROLLER_PACKAGE: &str = "com.android.permissioncontroller";

/// A point on the device screen, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Screen-space rectangle of a UI node, as reported by the hierarchy dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge
    pub left: i32,
    /// Top edge
    pub top: i32,
    /// Right edge (exclusive)
    pub right: i32,
    /// Bottom edge (exclusive)
    pub bottom: i32,
}

impl Bounds {
    /// Create bounds from edges
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Centre of the rectangle; where a click lands
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(
            self.left + (self.right - self.left) / 2,
            self.top + (self.bottom - self.top) / 2,
        )
    }

    /// Whether the point lies inside the rectangle
    #[must_use]
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    /// Zero-area bounds cannot be clicked
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// One node of the on-screen accessibility hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiNode {
    /// Visible text
    pub text: String,
    /// Content description (accessibility label)
    pub content_desc: String,
    /// View resource id, if any
    pub resource_id: String,
    /// Widget class name
    pub class: String,
    /// Package that owns the node
    pub package: String,
    /// Screen rectangle
    pub bounds: Bounds,
    /// Whether the node accepts clicks
    pub clickable: bool,
    /// Whether the node is enabled
    pub enabled: bool,
}

impl UiNode {
    /// Create an enabled, clickable node with the given text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            clickable: true,
            enabled: true,
            ..Self::default()
        }
    }

    /// Set the content description
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.content_desc = desc.into();
        self
    }

    /// Set the resource id
    #[must_use]
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = id.into();
        self
    }

    /// Set the widget class
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    /// Set the owning package
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Set the bounds
    #[must_use]
    pub const fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set clickability
    #[must_use]
    pub const fn clickable(mut self, clickable: bool) -> Self {
        self.clickable = clickable;
        self
    }
}

/// Screen orientation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Device's natural orientation (portrait on phones)
    #[default]
    Natural,
    /// Rotated 90° counter-clockwise
    Left,
    /// Rotated 90° clockwise
    Right,
}

impl Orientation {
    /// Value for `settings put system user_rotation`
    #[must_use]
    pub const fn user_rotation(&self) -> u8 {
        match self {
            Self::Natural => 0,
            Self::Left => 1,
            Self::Right => 3,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Natural => write!(f, "natural"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Abstract automation surface for one device.
///
/// Implementations report failures of the device itself as errors; the
/// controller decides which of those are tolerated.
///
/// # Implementations
///
/// - `AdbDevice` - real device or emulator through the `adb` binary
/// - `MockDevice` - scripted device for unit testing
pub trait DeviceDriver: fmt::Debug {
    /// Human-readable identity for logs (serial, model, ...)
    fn description(&self) -> String;

    /// Turn the display on
    fn wake_up(&mut self) -> ProbeResult<()>;

    /// Press the system back key
    fn press_back(&mut self) -> ProbeResult<()>;

    /// Force a screen orientation
    fn set_orientation(&mut self, orientation: Orientation) -> ProbeResult<()>;

    /// Package of the process currently owning the display
    fn current_package(&mut self) -> ProbeResult<String>;

    /// Whether no animation or window transition is pending
    fn is_idle(&mut self) -> ProbeResult<bool>;

    /// Snapshot of the current accessibility hierarchy, topmost window first
    fn dump_hierarchy(&mut self) -> ProbeResult<Vec<UiNode>>;

    /// Tap at a screen coordinate
    fn tap(&mut self, point: Point) -> ProbeResult<()>;

    /// Bring `package` to the foreground.
    ///
    /// Only used to restore the baseline between scenarios; surfaces that
    /// cannot launch apps keep the default no-op.
    fn launch(&mut self, package: &str) -> ProbeResult<()> {
        let _ = package;
        Ok(())
    }
}

/// Outcome of a best-effort wake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WakeOutcome {
    /// Display is on
    Awake,
    /// Wake failed; the failure was logged and the run continued
    FailedIgnored {
        /// Why the wake failed
        reason: String,
    },
}

impl WakeOutcome {
    /// Whether the wake succeeded
    #[must_use]
    pub const fn is_awake(&self) -> bool {
        matches!(self, Self::Awake)
    }
}

/// Outcome of a bounded idle-wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// Device reported idle
    Settled {
        /// Time until idle
        elapsed: Duration,
    },
    /// Timeout elapsed first; not an error by itself
    TimedOut {
        /// Time spent waiting
        elapsed: Duration,
    },
}

impl IdleOutcome {
    /// Whether the device settled before the timeout
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}

/// Device controller wrapping an automation driver.
///
/// One controller exists per run. Scenarios borrow it mutably, so two
/// automation sessions against the same device can never be live at once.
///
/// # Example
///
/// ```
/// use droidprobe::{DeviceController, MockDevice, Orientation};
/// use std::time::Duration;
///
/// let device = MockDevice::new("com.stickergaurdman");
/// let mut controller = DeviceController::new(device);
///
/// assert!(controller.wake().is_awake());
/// controller.set_orientation(Orientation::Left).unwrap();
/// controller.wait_for_idle(Duration::from_millis(100)).unwrap();
/// assert_eq!(controller.current_foreground_package().unwrap(), "com.stickergaurdman");
/// ```
#[derive(Debug)]
pub struct DeviceController {
    driver: Box<dyn DeviceDriver>,
    poll_interval_ms: u64,
    generation: u64,
}

impl DeviceController {
    /// Create a controller over a driver
    pub fn new(driver: impl DeviceDriver + 'static) -> Self {
        Self::from_boxed(Box::new(driver))
    }

    /// Create a controller over an already boxed driver
    #[must_use]
    pub fn from_boxed(driver: Box<dyn DeviceDriver>) -> Self {
        Self {
            driver,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            generation: 0,
        }
    }

    /// Set the polling interval used by idle-waits and element lookups
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Polling interval in milliseconds
    #[must_use]
    pub const fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    /// Driver description
    #[must_use]
    pub fn description(&self) -> String {
        self.driver.description()
    }

    /// Number of state-affecting actions issued so far.
    ///
    /// Element handles remember the generation they were found at and go
    /// stale once it moves.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Ensure the display is on. Never fails the run.
    pub fn wake(&mut self) -> WakeOutcome {
        match self.driver.wake_up() {
            Ok(()) => WakeOutcome::Awake,
            Err(err) => {
                tracing::warn!(device = %self.description(), error = %err, "wake failed, continuing");
                WakeOutcome::FailedIgnored {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Package of the process currently owning the display.
    ///
    /// Driver errors keep their variant: a lost device is
    /// [`crate::ProbeError::DeviceUnreachable`], an unreadable answer is
    /// [`crate::ProbeError::Automation`]. Both are environment errors.
    pub fn current_foreground_package(&mut self) -> ProbeResult<String> {
        self.driver.current_package()
    }

    /// Block until the device is idle or `timeout` elapses.
    ///
    /// A timeout is reported as [`IdleOutcome::TimedOut`]; the caller decides
    /// whether a missing state afterwards is a failure.
    pub fn wait_for_idle(&mut self, timeout: Duration) -> ProbeResult<IdleOutcome> {
        let waiter = Waiter::new(
            WaitOptions::new()
                .with_timeout(timeout.as_millis() as u64)
                .with_poll_interval(self.poll_interval_ms),
        );
        let driver = &mut self.driver;
        let result = waiter.wait_until("device idle", || driver.is_idle())?;
        if result.success {
            Ok(IdleOutcome::Settled {
                elapsed: result.elapsed,
            })
        } else {
            tracing::debug!(timeout_ms = timeout.as_millis() as u64, "idle-wait timed out");
            Ok(IdleOutcome::TimedOut {
                elapsed: result.elapsed,
            })
        }
    }

    /// Press the back key
    pub fn press_back(&mut self) -> ProbeResult<()> {
        self.generation += 1;
        tracing::debug!("press back");
        self.driver.press_back()
    }

    /// Change the screen orientation
    pub fn set_orientation(&mut self, orientation: Orientation) -> ProbeResult<()> {
        self.generation += 1;
        tracing::debug!(%orientation, "set orientation");
        self.driver.set_orientation(orientation)
    }

    /// Liveness probe: the automation surface still answers
    pub fn is_responsive(&mut self) -> bool {
        self.driver.current_package().is_ok()
    }

    /// Put the device back into the baseline state: natural orientation with
    /// `package` in the foreground.
    pub fn restore_baseline(&mut self, package: &str, settle: Duration) -> ProbeResult<()> {
        self.set_orientation(Orientation::Natural)?;
        self.wait_for_idle(settle)?;
        let foreground = self.current_foreground_package()?;
        if foreground != package {
            tracing::info!(%foreground, target = package, "relaunching target to restore baseline");
            self.generation += 1;
            self.driver.launch(package)?;
            self.wait_for_idle(settle)?;
        }
        Ok(())
    }

    pub(crate) fn dump_hierarchy(&mut self) -> ProbeResult<Vec<UiNode>> {
        self.driver.dump_hierarchy()
    }

    pub(crate) fn tap(&mut self, point: Point) -> ProbeResult<()> {
        self.generation += 1;
        self.driver.tap(point)
    }
}
