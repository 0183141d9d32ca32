//! Real-device backend over the `adb` binary.
//!
//! Every [`DeviceDriver`] call becomes one or two `adb shell` invocations:
//!
//! | Operation         | Command                                                |
//! |-------------------|--------------------------------------------------------|
//! | `wake_up`         | `input keyevent KEYCODE_WAKEUP`                        |
//! | `press_back`      | `input keyevent KEYCODE_BACK`                          |
//! | `set_orientation` | `settings put system user_rotation <n>`                |
//! | `current_package` | `dumpsys window` (focused window)                      |
//! | `is_idle`         | `dumpsys window` (app transition state)                |
//! | `dump_hierarchy`  | `rm -f` + `uiautomator dump` + `cat`                   |
//! | `tap`             | `input tap <x> <y>`                                    |
//! | `launch`          | `monkey -p <pkg> -c android.intent.category.LAUNCHER 1`|

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::HarnessConfig;
use crate::driver::{Bounds, DeviceDriver, Orientation, Point, UiNode};
use crate::result::{ProbeError, ProbeResult};

/// Where `uiautomator dump` writes on the device
const DUMP_PATH: &str = "/sdcard/droidprobe-window.xml";

/// adb stderr fragments meaning the device is gone, not the command
const UNREACHABLE_MARKERS: [&str; 4] = [
    "no devices/emulators found",
    "device offline",
    "device unauthorized",
    "error: closed",
];

/// Whether adb's stderr reports a lost device rather than a failed command.
///
/// A shell command missing on the device (`sh: uiautomator: not found`) is
/// an automation failure; only `device '<serial>' not found` means the
/// device is gone.
fn is_unreachable(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    UNREACHABLE_MARKERS.iter().any(|m| lower.contains(m))
        || lower
            .find("device '")
            .is_some_and(|at| lower[at..].contains("' not found"))
}

/// Parses `uiautomator` XML and `dumpsys window` output
#[derive(Debug, Clone)]
pub struct DumpParser {
    node: Regex,
    attribute: Regex,
    bounds: Regex,
    focus: Regex,
    focused_app: Regex,
    transition: Regex,
}

impl DumpParser {
    /// Compile the parser's patterns
    pub fn new() -> ProbeResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ProbeError::config(format!("invalid dump pattern '{pattern}': {e}")))
        };
        Ok(Self {
            node: compile(r"<node\s([^>]*?)/?>")?,
            attribute: compile(r#"([\w-]+)="([^"]*)""#)?,
            bounds: compile(r"^\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]$")?,
            focus: compile(r"mCurrentFocus=Window\{\S+ \S+ ([A-Za-z0-9_.]+)/")?,
            focused_app: compile(r"mFocusedApp=\w+\{\S+ \S+ ([A-Za-z0-9_.]+)/")?,
            transition: compile(r"mAppTransitionState=(\w+)")?,
        })
    }

    /// Nodes of a `uiautomator dump` document, in document order
    pub fn parse_hierarchy(&self, xml: &str) -> ProbeResult<Vec<UiNode>> {
        if !xml.contains("<hierarchy") {
            return Err(ProbeError::automation(
                "dump_hierarchy",
                "output is not a uiautomator hierarchy",
            ));
        }
        Ok(self
            .node
            .captures_iter(xml)
            .filter_map(|caps| caps.get(1))
            .map(|attrs| self.parse_node(attrs.as_str()))
            .collect())
    }

    fn parse_node(&self, attrs: &str) -> UiNode {
        let mut node = UiNode::default();
        for caps in self.attribute.captures_iter(attrs) {
            let (Some(key), Some(raw)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let value = unescape_xml(raw.as_str());
            match key.as_str() {
                "text" => node.text = value,
                "content-desc" => node.content_desc = value,
                "resource-id" => node.resource_id = value,
                "class" => node.class = value,
                "package" => node.package = value,
                "bounds" => node.bounds = self.parse_bounds(&value).unwrap_or_default(),
                "clickable" => node.clickable = value == "true",
                "enabled" => node.enabled = value == "true",
                _ => {}
            }
        }
        node
    }

    /// Parse `[x1,y1][x2,y2]`
    #[must_use]
    pub fn parse_bounds(&self, raw: &str) -> Option<Bounds> {
        let caps = self.bounds.captures(raw.trim())?;
        let edge = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
        Some(Bounds::new(edge(1)?, edge(2)?, edge(3)?, edge(4)?))
    }

    /// Package of the focused window, falling back to the focused activity
    #[must_use]
    pub fn parse_focused_package(&self, dumpsys: &str) -> Option<String> {
        self.focus
            .captures(dumpsys)
            .or_else(|| self.focused_app.captures(dumpsys))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Whether no app transition is running; absent state counts as idle
    #[must_use]
    pub fn transition_idle(&self, dumpsys: &str) -> bool {
        self.transition
            .captures_iter(dumpsys)
            .filter_map(|caps| caps.get(1))
            .all(|state| state.as_str() == "APP_STATE_IDLE")
    }
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#10;", "\n")
        .replace("&amp;", "&")
}

/// Device reached through `adb`
#[derive(Debug, Clone)]
pub struct AdbDevice {
    adb: PathBuf,
    serial: Option<String>,
    parser: DumpParser,
}

impl AdbDevice {
    /// Device picked by adb, using `adb` from `PATH`
    pub fn new() -> ProbeResult<Self> {
        Ok(Self {
            adb: PathBuf::from("adb"),
            serial: None,
            parser: DumpParser::new()?,
        })
    }

    /// Device described by the harness configuration
    pub fn from_config(config: &HarnessConfig) -> ProbeResult<Self> {
        Ok(Self::new()?
            .with_adb(&config.adb)
            .with_serial(config.serial.clone()))
    }

    /// Set the adb binary
    #[must_use]
    pub fn with_adb(mut self, adb: impl AsRef<Path>) -> Self {
        self.adb = adb.as_ref().to_path_buf();
        self
    }

    /// Target a specific device serial
    #[must_use]
    pub fn with_serial(mut self, serial: Option<String>) -> Self {
        self.serial = serial;
        self
    }

    /// Serial in use, if any
    #[must_use]
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Check if the adb binary can be executed
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.adb)
            .arg("version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Raw `uiautomator` XML of the current window.
    ///
    /// The previous dump is removed first and `uiautomator` must report the
    /// write, so a failed dump never returns an older window.
    pub fn dump_xml(&mut self) -> ProbeResult<String> {
        self.shell("dump_hierarchy", &["rm", "-f", DUMP_PATH])?;
        let status = self.shell("dump_hierarchy", &["uiautomator", "dump", DUMP_PATH])?;
        if !status.contains("dumped to") {
            return Err(ProbeError::automation(
                "dump_hierarchy",
                format!("uiautomator dump failed: {}", status.trim()),
            ));
        }
        self.shell("dump_hierarchy", &["cat", DUMP_PATH])
    }

    /// Arguments passed to adb for a shell command
    fn command_args(&self, args: &[&str]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 3);
        if let Some(serial) = &self.serial {
            full.push("-s".to_string());
            full.push(serial.clone());
        }
        full.push("shell".to_string());
        full.extend(args.iter().map(ToString::to_string));
        full
    }

    fn shell(&self, action: &str, args: &[&str]) -> ProbeResult<String> {
        let full = self.command_args(args);
        tracing::trace!(adb = %self.adb.display(), args = ?full, "adb");

        let output = Command::new(&self.adb).args(&full).output().map_err(|e| {
            ProbeError::unreachable(format!("cannot run {}: {e}", self.adb.display()))
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let message = stderr.trim().to_string();
            if is_unreachable(&message) {
                return Err(ProbeError::unreachable(message));
            }
            return Err(ProbeError::automation(action, message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DeviceDriver for AdbDevice {
    fn description(&self) -> String {
        match &self.serial {
            Some(serial) => format!("adb device {serial}"),
            None => "adb default device".to_string(),
        }
    }

    fn wake_up(&mut self) -> ProbeResult<()> {
        self.shell("wake_up", &["input", "keyevent", "KEYCODE_WAKEUP"])
            .map(drop)
    }

    fn press_back(&mut self) -> ProbeResult<()> {
        self.shell("press_back", &["input", "keyevent", "KEYCODE_BACK"])
            .map(drop)
    }

    fn set_orientation(&mut self, orientation: Orientation) -> ProbeResult<()> {
        self.shell(
            "set_orientation",
            &["settings", "put", "system", "accelerometer_rotation", "0"],
        )?;
        let rotation = orientation.user_rotation().to_string();
        self.shell(
            "set_orientation",
            &["settings", "put", "system", "user_rotation", &rotation],
        )
        .map(drop)
    }

    fn current_package(&mut self) -> ProbeResult<String> {
        let dumpsys = self.shell("current_package", &["dumpsys", "window"])?;
        self.parser
            .parse_focused_package(&dumpsys)
            .ok_or_else(|| ProbeError::automation("current_package", "no focused window"))
    }

    fn is_idle(&mut self) -> ProbeResult<bool> {
        let dumpsys = self.shell("is_idle", &["dumpsys", "window"])?;
        Ok(self.parser.transition_idle(&dumpsys))
    }

    fn dump_hierarchy(&mut self) -> ProbeResult<Vec<UiNode>> {
        let xml = self.dump_xml()?;
        self.parser.parse_hierarchy(&xml)
    }

    fn tap(&mut self, point: Point) -> ProbeResult<()> {
        let (x, y) = (point.x.to_string(), point.y.to_string());
        self.shell("tap", &["input", "tap", &x, &y]).map(drop)
    }

    fn launch(&mut self, package: &str) -> ProbeResult<()> {
        self.shell(
            "launch",
            &[
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ],
        )
        .map(drop)
    }
}
