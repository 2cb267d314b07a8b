use std::fmt::Display;

use crate::trace::TraceEntry;

/// A pixel rectangle in display coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// True if the two rectangles share any pixels. Empty rects never
    /// intersect anything.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    pub fn contains(&self, other: &Rect) -> bool {
        !self.is_empty()
            && self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }
}

impl Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct WindowManagerPolicy {
    pub rotation: i32,
    pub orientation: i32,
    pub focused_app: String,
    pub screen_on_fully: bool,
    pub keyguard_draw_complete: bool,
    pub window_manager_draw_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct KeyguardState {
    pub keyguard_showing: bool,
    pub aod_showing: bool,
    /// Displays on which the keyguard is currently occluded
    pub occluded_displays: Vec<i32>,
}

/// The concrete role of a [WindowContainer] node.
///
/// Variant declaration order is load-bearing: the builder resolves a child
/// node into the first variant present in the decoded arguments, checked in
/// exactly this order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerKind {
    DisplayContent {
        display_id: i32,
        logical_width: i32,
        logical_height: i32,
        focused_root_task_id: i32,
    },
    DisplayArea {
        is_task_display_area: bool,
        is_root_display_area: bool,
    },
    Task {
        id: i32,
        activity_type: i32,
        bounds: Rect,
    },
    TaskFragment {
        activity_type: i32,
        display_id: i32,
    },
    Activity {
        name: String,
        state: String,
        proc_id: i32,
        translucent: bool,
        front_of_task: bool,
    },
    WindowToken,
    WindowState {
        window_type: i32,
        flags: i32,
        frame: Rect,
        requested_width: i32,
        requested_height: i32,
        surface_shown: bool,
        layer: i32,
    },
    Container,
}

impl ContainerKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DisplayContent { .. } => "DisplayContent",
            Self::DisplayArea { .. } => "DisplayArea",
            Self::Task { .. } => "Task",
            Self::TaskFragment { .. } => "TaskFragment",
            Self::Activity { .. } => "Activity",
            Self::WindowToken => "WindowToken",
            Self::WindowState { .. } => "WindowState",
            Self::Container => "Container",
        }
    }
}

/// One node of the window hierarchy.
///
/// The tree owns its children; there are no back-references. Children are
/// ordered topmost first, so a pre-order walk visits windows in z-order.
#[derive(Debug, Clone)]
pub struct WindowContainer {
    pub title: String,
    pub token: String,
    pub visible: bool,
    pub orientation: i32,
    pub kind: ContainerKind,
    pub children: Vec<WindowContainer>,
}

impl WindowContainer {
    pub fn is_window(&self) -> bool {
        matches!(self.kind, ContainerKind::WindowState { .. })
    }

    pub fn is_activity(&self) -> bool {
        matches!(self.kind, ContainerKind::Activity { .. })
    }

    pub fn frame(&self) -> Option<Rect> {
        match &self.kind {
            ContainerKind::WindowState { frame, .. } => Some(*frame),
            _ => None,
        }
    }

    /// Pre-order walk over this node and everything below it
    pub fn iter(&self) -> impl Iterator<Item = &WindowContainer> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            for child in node.children.iter().rev() {
                stack.push(child);
            }
            Some(node)
        })
    }

    /// All [ContainerKind::WindowState] nodes below (and including) this one,
    /// topmost first
    pub fn windows(&self) -> Vec<&WindowContainer> {
        self.iter().filter(|c| c.is_window()).collect()
    }

    fn collect_app_windows<'a>(&'a self, below_activity: bool, into: &mut Vec<&'a WindowContainer>) {
        if self.is_window() && below_activity {
            into.push(self);
        }
        let below = below_activity || self.is_activity();
        for child in &self.children {
            child.collect_app_windows(below, into);
        }
    }

    /// Windows that live below an activity in the hierarchy, topmost first
    pub fn app_windows(&self) -> Vec<&WindowContainer> {
        let mut windows = Vec::new();
        self.collect_app_windows(false, &mut windows);
        windows
    }
}

/// An immutable snapshot of the window manager at one point in time
#[derive(Debug, Clone)]
pub struct WindowManagerState {
    pub elapsed_timestamp_nanos: i64,
    pub clock_timestamp_nanos: i64,
    pub policy: WindowManagerPolicy,
    pub focused_app: String,
    pub focused_display_id: i32,
    pub focused_window: String,
    pub keyguard: KeyguardState,
    pub root: WindowContainer,
}

impl WindowManagerState {
    pub fn windows(&self) -> Vec<&WindowContainer> {
        self.root.windows()
    }

    pub fn visible_windows(&self) -> Vec<&WindowContainer> {
        self.root
            .windows()
            .into_iter()
            .filter(|w| w.visible)
            .collect()
    }

    pub fn app_windows(&self) -> Vec<&WindowContainer> {
        self.root.app_windows()
    }

    /// The topmost visible app window, if any
    pub fn top_visible_app_window(&self) -> Option<&WindowContainer> {
        self.root.app_windows().into_iter().find(|w| w.visible)
    }

    pub fn is_keyguard_showing(&self) -> bool {
        self.keyguard.keyguard_showing
    }
}

impl TraceEntry for WindowManagerState {
    fn elapsed_timestamp_nanos(&self) -> i64 {
        self.elapsed_timestamp_nanos
    }
}

/// An ordered sequence of [WindowManagerState] snapshots from one trace file
#[derive(Debug, Clone, Default)]
pub struct WindowManagerTrace {
    entries: Vec<WindowManagerState>,
}

impl WindowManagerTrace {
    pub fn new(entries: Vec<WindowManagerState>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[WindowManagerState] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first(&self) -> Option<&WindowManagerState> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&WindowManagerState> {
        self.entries.last()
    }
}
