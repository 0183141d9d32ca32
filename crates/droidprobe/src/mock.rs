//! Scriptable in-memory device.
//!
//! `MockDevice` implements [`DeviceDriver`] over shared state, so a test can
//! keep a clone, hand another clone to a [`DeviceController`](crate::DeviceController),
//! and inspect what the harness did afterwards.
//!
//! Permission dialogs are modelled as a queue of node groups drawn on top of
//! the current screen; tapping inside the front dialog dismisses it.

use crate::driver::{
    Bounds, DeviceDriver, Orientation, Point, UiNode, LAUNCHER_PACKAGE,
    PERMISSION_CONTROLLER_PACKAGE,
};
use crate::result::{ProbeError, ProbeResult};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

/// Driver operations that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// `wake_up`
    Wake,
    /// `press_back`
    Back,
    /// `set_orientation`
    Orientation,
    /// `current_package`
    Package,
    /// `is_idle`
    Idle,
    /// `dump_hierarchy`
    Dump,
    /// `tap`
    Tap,
    /// `launch`
    Launch,
}

impl MockOp {
    const fn name(self) -> &'static str {
        match self {
            Self::Wake => "wake_up",
            Self::Back => "press_back",
            Self::Orientation => "set_orientation",
            Self::Package => "current_package",
            Self::Idle => "is_idle",
            Self::Dump => "dump_hierarchy",
            Self::Tap => "tap",
            Self::Launch => "launch",
        }
    }
}

#[derive(Debug)]
struct MockState {
    target: String,
    foreground: String,
    orientation: Orientation,
    screen: Vec<UiNode>,
    links: Vec<(Bounds, Vec<UiNode>)>,
    crash_zones: Vec<Bounds>,
    prompts: VecDeque<Vec<UiNode>>,
    settle_polls: u32,
    busy_polls: u32,
    back_exits: bool,
    crash_on_rotation: bool,
    failures: HashSet<MockOp>,
    unreachable: bool,
    calls: Vec<String>,
    taps: Vec<Point>,
    dismissed: Vec<String>,
}

/// Mock device for unit testing
#[derive(Debug, Clone)]
pub struct MockDevice {
    state: Rc<RefCell<MockState>>,
}

impl MockDevice {
    /// Create a device with `package` in the foreground, portrait, idle and
    /// showing an empty screen
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        let package = package.into();
        Self {
            state: Rc::new(RefCell::new(MockState {
                target: package.clone(),
                foreground: package,
                orientation: Orientation::Natural,
                screen: Vec::new(),
                links: Vec::new(),
                crash_zones: Vec::new(),
                prompts: VecDeque::new(),
                settle_polls: 0,
                busy_polls: 0,
                back_exits: false,
                crash_on_rotation: false,
                failures: HashSet::new(),
                unreachable: false,
                calls: Vec::new(),
                taps: Vec::new(),
                dismissed: Vec::new(),
            })),
        }
    }

    /// Build a system permission dialog with a message, an allow button
    /// labelled `allow_label` and a deny button
    #[must_use]
    pub fn permission_prompt(message: &str, allow_label: &str) -> Vec<UiNode> {
        vec![
            UiNode::new(message)
                .clickable(false)
                .with_package(PERMISSION_CONTROLLER_PACKAGE)
                .with_resource_id("com.android.permissioncontroller:id/permission_message")
                .with_bounds(Bounds::new(60, 900, 1020, 1100)),
            UiNode::new(allow_label)
                .with_package(PERMISSION_CONTROLLER_PACKAGE)
                .with_class("android.widget.Button")
                .with_resource_id(
                    "com.android.permissioncontroller:id/permission_allow_foreground_only_button",
                )
                .with_bounds(Bounds::new(60, 1150, 1020, 1280)),
            UiNode::new("Don't allow")
                .with_package(PERMISSION_CONTROLLER_PACKAGE)
                .with_class("android.widget.Button")
                .with_resource_id("com.android.permissioncontroller:id/permission_deny_button")
                .with_bounds(Bounds::new(60, 1300, 1020, 1430)),
        ]
    }

    /// Queue a dialog on top of the screen
    pub fn push_prompt(&self, nodes: Vec<UiNode>) {
        self.state.borrow_mut().prompts.push_back(nodes);
    }

    /// Replace the nodes of the current app screen
    pub fn set_screen(&self, nodes: Vec<UiNode>) {
        self.state.borrow_mut().screen = nodes;
    }

    /// Tapping inside `bounds` replaces the screen with `next`
    pub fn link(&self, bounds: Bounds, next: Vec<UiNode>) {
        self.state.borrow_mut().links.push((bounds, next));
    }

    /// Tapping inside `bounds` kills the app (foreground falls back to launcher)
    pub fn crash_on_tap(&self, bounds: Bounds) {
        self.state.borrow_mut().crash_zones.push(bounds);
    }

    /// Number of idle polls that report busy after each action
    pub fn set_settle_polls(&self, polls: u32) {
        self.state.borrow_mut().settle_polls = polls;
    }

    /// Whether back on the home screen exits to the launcher
    pub fn set_back_exits(&self, exits: bool) {
        self.state.borrow_mut().back_exits = exits;
    }

    /// Whether rotating kills the app (foreground falls back to launcher)
    pub fn set_crash_on_rotation(&self, crash: bool) {
        self.state.borrow_mut().crash_on_rotation = crash;
    }

    /// Force the foreground package
    pub fn set_foreground(&self, package: impl Into<String>) {
        self.state.borrow_mut().foreground = package.into();
    }

    /// Make `op` fail with an automation error
    pub fn fail_on(&self, op: MockOp) {
        self.state.borrow_mut().failures.insert(op);
    }

    /// Stop failing `op`
    pub fn recover(&self, op: MockOp) {
        self.state.borrow_mut().failures.remove(&op);
    }

    /// Make every operation fail as if the device vanished
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.borrow_mut().unreachable = unreachable;
    }

    /// Current foreground package
    #[must_use]
    pub fn foreground(&self) -> String {
        self.state.borrow().foreground.clone()
    }

    /// Current orientation
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.state.borrow().orientation
    }

    /// Dialogs still waiting to be dismissed
    #[must_use]
    pub fn pending_prompts(&self) -> usize {
        self.state.borrow().prompts.len()
    }

    /// Every tap issued so far
    #[must_use]
    pub fn taps(&self) -> Vec<Point> {
        self.state.borrow().taps.clone()
    }

    /// Labels of the buttons that dismissed dialogs
    #[must_use]
    pub fn dismissed(&self) -> Vec<String> {
        self.state.borrow().dismissed.clone()
    }

    /// Call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state
            .borrow()
            .calls
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Record the call and apply scripted failures
    fn enter(&self, op: MockOp, detail: Option<String>) -> ProbeResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = match detail {
            Some(detail) => format!("{}:{detail}", op.name()),
            None => op.name().to_string(),
        };
        state.calls.push(entry);
        if state.unreachable {
            return Err(ProbeError::unreachable("mock device disconnected"));
        }
        if state.failures.contains(&op) {
            return Err(ProbeError::automation(op.name(), "scripted failure"));
        }
        Ok(())
    }

    fn begin_transition(state: &mut MockState) {
        state.busy_polls = state.settle_polls;
    }
}

impl DeviceDriver for MockDevice {
    fn description(&self) -> String {
        format!("mock device ({})", self.state.borrow().target)
    }

    fn wake_up(&mut self) -> ProbeResult<()> {
        self.enter(MockOp::Wake, None)
    }

    fn press_back(&mut self) -> ProbeResult<()> {
        self.enter(MockOp::Back, None)?;
        let mut state = self.state.borrow_mut();
        Self::begin_transition(&mut state);
        if state.prompts.pop_front().is_some() {
            return Ok(());
        }
        if state.back_exits {
            state.foreground = LAUNCHER_PACKAGE.to_string();
        }
        Ok(())
    }

    fn set_orientation(&mut self, orientation: Orientation) -> ProbeResult<()> {
        self.enter(MockOp::Orientation, Some(orientation.to_string()))?;
        let mut state = self.state.borrow_mut();
        Self::begin_transition(&mut state);
        if state.orientation != orientation && state.crash_on_rotation {
            state.foreground = LAUNCHER_PACKAGE.to_string();
        }
        state.orientation = orientation;
        Ok(())
    }

    fn current_package(&mut self) -> ProbeResult<String> {
        self.enter(MockOp::Package, None)?;
        let state = self.state.borrow();
        if state.foreground == state.target && !state.prompts.is_empty() {
            return Ok(PERMISSION_CONTROLLER_PACKAGE.to_string());
        }
        Ok(state.foreground.clone())
    }

    fn is_idle(&mut self) -> ProbeResult<bool> {
        self.enter(MockOp::Idle, None)?;
        let mut state = self.state.borrow_mut();
        if state.busy_polls == 0 {
            return Ok(true);
        }
        state.busy_polls -= 1;
        Ok(false)
    }

    fn dump_hierarchy(&mut self) -> ProbeResult<Vec<UiNode>> {
        self.enter(MockOp::Dump, None)?;
        let state = self.state.borrow();
        let mut nodes = Vec::new();
        if let Some(prompt) = state.prompts.front() {
            nodes.extend(prompt.iter().cloned());
        }
        if state.foreground == state.target {
            nodes.extend(state.screen.iter().cloned());
        }
        Ok(nodes)
    }

    fn tap(&mut self, point: Point) -> ProbeResult<()> {
        self.enter(MockOp::Tap, Some(format!("{},{}", point.x, point.y)))?;
        let mut state = self.state.borrow_mut();
        state.taps.push(point);
        Self::begin_transition(&mut state);

        let hit = state.prompts.front().and_then(|prompt| {
            prompt
                .iter()
                .find(|n| n.clickable && n.bounds.contains(point))
                .map(|n| n.text.clone())
        });
        if let Some(label) = hit {
            state.prompts.pop_front();
            state.dismissed.push(label);
            return Ok(());
        }
        if !state.prompts.is_empty() {
            // dialogs are modal
            return Ok(());
        }
        if state.crash_zones.iter().any(|b| b.contains(point)) {
            state.foreground = LAUNCHER_PACKAGE.to_string();
            return Ok(());
        }

        let next = state
            .links
            .iter()
            .find(|(bounds, _)| bounds.contains(point))
            .map(|(_, next)| next.clone());
        if let Some(next) = next {
            state.screen = next;
        }
        Ok(())
    }

    fn launch(&mut self, package: &str) -> ProbeResult<()> {
        self.enter(MockOp::Launch, Some(package.to_string()))?;
        let mut state = self.state.borrow_mut();
        Self::begin_transition(&mut state);
        state.foreground = package.to_string();
        Ok(())
    }
}
