use std::fmt::Display;

use crate::trace::layers::LayersTrace;
use crate::trace::windowmanager::{WindowContainer, WindowManagerState, WindowManagerTrace};

use super::checker::{AssertionsChecker, NamedPredicate};
use super::Result;

/// Matches windows and layers by the package/class pair encoded in their
/// titles (e.g. `com.example/com.example.MainActivity`).
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMatcher {
    package: String,
    class: Option<String>,
}

impl ComponentMatcher {
    pub fn new<P: AsRef<str>, C: AsRef<str>>(package: P, class: C) -> Self {
        Self {
            package: package.as_ref().into(),
            class: Some(class.as_ref().into()),
        }
    }

    /// Match any component of the given package
    pub fn package<P: AsRef<str>>(package: P) -> Self {
        Self {
            package: package.as_ref().into(),
            class: None,
        }
    }

    /// Parse a `package/class` string; without a `/` the whole string is
    /// treated as a package
    pub fn parse(component: &str) -> Self {
        match component.split_once('/') {
            Some((package, class)) => Self::new(package, class),
            None => Self::package(component),
        }
    }

    pub fn matches(&self, title: &str) -> bool {
        let (package, class) = match title.split_once('/') {
            Some(v) => v,
            None => (title, ""),
        };
        if package != self.package {
            return false;
        }
        match &self.class {
            None => true,
            // short class names in titles ('.Main') resolve against the package
            Some(want) => {
                class == want
                    || (want.starts_with('.') && class == format!("{}{}", self.package, want))
                    || (class.starts_with('.') && want == &format!("{}{}", self.package, class))
            }
        }
    }

    pub fn matches_window(&self, window: &WindowContainer) -> bool {
        self.matches(&window.title)
    }

    /// Layer names carry a `#<id>` suffix, which is ignored for matching
    pub fn matches_layer_name(&self, name: &str) -> bool {
        let name = name.split('#').next().unwrap_or(name);
        self.matches(name)
    }
}

impl Display for ComponentMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{}/{}", self.package, class),
            None => write!(f, "{}", self.package),
        }
    }
}

/// Fluent assertions over an ordered window manager trace.
///
/// Checks added between `then()` calls apply to one consecutive range of
/// entries; `then()` starts the next range:
///
/// ```ignore
/// WindowManagerTraceSubject::new(&trace)
///     .is_app_window_on_top(&launcher)
///     .then()
///     .is_app_window_on_top(&app)
///     .check()?;
/// ```
pub struct WindowManagerTraceSubject<'t> {
    trace: &'t WindowManagerTrace,
    checker: AssertionsChecker<WindowManagerState>,
}

impl<'t> WindowManagerTraceSubject<'t> {
    pub fn new(trace: &'t WindowManagerTrace) -> Self {
        Self {
            trace,
            checker: AssertionsChecker::new(),
        }
    }

    pub fn then(mut self) -> Self {
        self.checker.next_block();
        self
    }

    pub fn is_app_window_on_top(mut self, matcher: &ComponentMatcher) -> Self {
        let m = matcher.clone();
        self.checker.append(NamedPredicate::new(
            &format!("isAppWindowOnTop({})", matcher),
            move |s: &WindowManagerState| {
                s.top_visible_app_window()
                    .map_or(false, |w| m.matches_window(w))
            },
        ));
        self
    }

    pub fn is_app_window_visible(mut self, matcher: &ComponentMatcher) -> Self {
        let m = matcher.clone();
        self.checker.append(NamedPredicate::new(
            &format!("isAppWindowVisible({})", matcher),
            move |s: &WindowManagerState| s.app_windows().iter().any(|w| w.visible && m.matches_window(w)),
        ));
        self
    }

    pub fn is_app_window_invisible(mut self, matcher: &ComponentMatcher) -> Self {
        let m = matcher.clone();
        self.checker.append(NamedPredicate::new(
            &format!("isAppWindowInvisible({})", matcher),
            move |s: &WindowManagerState| !s.app_windows().iter().any(|w| w.visible && m.matches_window(w)),
        ));
        self
    }

    pub fn contains_window(mut self, matcher: &ComponentMatcher) -> Self {
        let m = matcher.clone();
        self.checker.append(NamedPredicate::new(
            &format!("containsWindow({})", matcher),
            move |s: &WindowManagerState| s.windows().iter().any(|w| m.matches_window(w)),
        ));
        self
    }

    pub fn is_keyguard_showing(mut self) -> Self {
        self.checker.append(NamedPredicate::new(
            "isKeyguardShowing",
            |s: &WindowManagerState| s.is_keyguard_showing(),
        ));
        self
    }

    /// No visible window of `a` overlaps a visible window of `b` in any entry
    /// of the range
    pub fn no_windows_overlap(mut self, a: &ComponentMatcher, b: &ComponentMatcher) -> Self {
        let (ma, mb) = (a.clone(), b.clone());
        self.checker.append(NamedPredicate::new(
            &format!("noWindowsOverlap({}, {})", a, b),
            move |s: &WindowManagerState| {
                let visible = s.visible_windows();
                let frames_a = visible
                    .iter()
                    .filter(|w| ma.matches_window(w))
                    .filter_map(|w| w.frame());
                for fa in frames_a {
                    let overlaps = visible
                        .iter()
                        .filter(|w| mb.matches_window(w))
                        .filter_map(|w| w.frame())
                        .any(|fb| fa.intersects(&fb));
                    if overlaps {
                        return false;
                    }
                }
                true
            },
        ));
        self
    }

    pub fn check(self) -> Result<()> {
        self.checker.check(self.trace.entries())
    }
}

/// Fluent assertions over an ordered surface flinger trace
pub struct LayersTraceSubject<'t> {
    trace: &'t LayersTrace,
    checker: AssertionsChecker<crate::trace::layers::LayerTraceEntry>,
}

impl<'t> LayersTraceSubject<'t> {
    pub fn new(trace: &'t LayersTrace) -> Self {
        Self {
            trace,
            checker: AssertionsChecker::new(),
        }
    }

    pub fn then(mut self) -> Self {
        self.checker.next_block();
        self
    }

    pub fn is_visible(mut self, matcher: &ComponentMatcher) -> Self {
        let m = matcher.clone();
        self.checker.append(NamedPredicate::new(
            &format!("isVisible({})", matcher),
            move |e: &crate::trace::layers::LayerTraceEntry| {
                e.visible_layers()
                    .iter()
                    .any(|l| m.matches_layer_name(&l.name))
            },
        ));
        self
    }

    pub fn is_invisible(mut self, matcher: &ComponentMatcher) -> Self {
        let m = matcher.clone();
        self.checker.append(NamedPredicate::new(
            &format!("isInvisible({})", matcher),
            move |e: &crate::trace::layers::LayerTraceEntry| {
                !e.visible_layers()
                    .iter()
                    .any(|l| m.matches_layer_name(&l.name))
            },
        ));
        self
    }

    pub fn check(self) -> Result<()> {
        self.checker.check(self.trace.entries())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trace::windowmanager::{
        ContainerKind, KeyguardState, Rect, WindowManagerPolicy, WindowManagerState,
    };

    fn window(title: &str, visible: bool, frame: Rect) -> WindowContainer {
        WindowContainer {
            title: title.into(),
            token: "0".into(),
            visible,
            orientation: 0,
            kind: ContainerKind::WindowState {
                window_type: 1,
                flags: 0,
                frame,
                requested_width: frame.width(),
                requested_height: frame.height(),
                surface_shown: visible,
                layer: 0,
            },
            children: Vec::new(),
        }
    }

    fn activity_with_window(title: &str, visible: bool, frame: Rect) -> WindowContainer {
        WindowContainer {
            title: title.into(),
            token: "0".into(),
            visible,
            orientation: 0,
            kind: ContainerKind::Activity {
                name: title.into(),
                state: if visible { "RESUMED" } else { "STOPPED" }.into(),
                proc_id: 1,
                translucent: false,
                front_of_task: true,
            },
            children: vec![window(title, visible, frame)],
        }
    }

    fn state(ts: i64, windows: Vec<WindowContainer>) -> WindowManagerState {
        WindowManagerState {
            elapsed_timestamp_nanos: ts,
            clock_timestamp_nanos: ts,
            policy: WindowManagerPolicy::default(),
            focused_app: String::new(),
            focused_display_id: 0,
            focused_window: String::new(),
            keyguard: KeyguardState::default(),
            root: WindowContainer {
                title: "ROOT".into(),
                token: "0".into(),
                visible: true,
                orientation: 0,
                kind: ContainerKind::Container,
                children: windows,
            },
        }
    }

    const FULL: Rect = Rect {
        left: 0,
        top: 0,
        right: 1080,
        bottom: 2400,
    };

    #[test]
    fn test_component_matcher() {
        let m = ComponentMatcher::parse("com.example/com.example.Main");
        assert!(m.matches("com.example/com.example.Main"));
        assert!(!m.matches("com.other/com.other.Main"));
        assert!(!m.matches("com.example/com.example.Other"));

        // short class form on either side
        let short = ComponentMatcher::new("com.example", ".Main");
        assert!(short.matches("com.example/com.example.Main"));
        assert!(short.matches("com.example/.Main"));

        let pkg = ComponentMatcher::package("com.example");
        assert!(pkg.matches("com.example/com.example.Anything"));

        assert!(m.matches_layer_name("com.example/com.example.Main#7"));
    }

    #[test]
    fn test_app_window_on_top_then() {
        let launcher = "com.launcher/com.launcher.Home";
        let app = "com.example/com.example.Main";
        let trace = WindowManagerTrace::new(vec![
            state(0, vec![activity_with_window(launcher, true, FULL)]),
            state(
                100,
                vec![
                    activity_with_window(app, true, FULL),
                    activity_with_window(launcher, true, FULL),
                ],
            ),
            state(200, vec![activity_with_window(app, true, FULL)]),
        ]);

        WindowManagerTraceSubject::new(&trace)
            .is_app_window_on_top(&ComponentMatcher::parse(launcher))
            .then()
            .is_app_window_on_top(&ComponentMatcher::parse(app))
            .check()
            .expect("launcher then app");
    }

    #[test]
    fn test_failure_names_timestamp_and_predicate() {
        let app = "com.example/com.example.Main";
        let trace = WindowManagerTrace::new(vec![
            state(0, vec![activity_with_window(app, true, FULL)]),
            state(100, vec![activity_with_window(app, false, FULL)]),
        ]);

        let err = WindowManagerTraceSubject::new(&trace)
            .is_app_window_visible(&ComponentMatcher::parse(app))
            .check()
            .expect_err("second entry is invisible");

        let facts = err.facts().expect("structured facts");
        assert!(facts
            .iter()
            .any(|f| f.key == "entry timestamp" && f.value == "100"));
        assert!(facts
            .iter()
            .any(|f| f.key == "failed predicate" && f.value.contains("isAppWindowVisible")));
    }

    #[test]
    fn test_no_windows_overlap() {
        let a = "com.a/com.a.Main";
        let b = "com.b/com.b.Main";
        let left = Rect::new(0, 0, 540, 2400);
        let right = Rect::new(540, 0, 1080, 2400);

        let split = WindowManagerTrace::new(vec![state(
            0,
            vec![
                activity_with_window(a, true, left),
                activity_with_window(b, true, right),
            ],
        )]);

        WindowManagerTraceSubject::new(&split)
            .no_windows_overlap(&ComponentMatcher::parse(a), &ComponentMatcher::parse(b))
            .check()
            .expect("split windows don't overlap");

        let stacked = WindowManagerTrace::new(vec![state(
            0,
            vec![
                activity_with_window(a, true, FULL),
                activity_with_window(b, true, FULL),
            ],
        )]);

        WindowManagerTraceSubject::new(&stacked)
            .no_windows_overlap(&ComponentMatcher::parse(a), &ComponentMatcher::parse(b))
            .check()
            .expect_err("stacked windows overlap");
    }
}
