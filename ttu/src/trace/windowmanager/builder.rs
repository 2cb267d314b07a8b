use log::trace;

use crate::trace::args::ArgsNode;
use crate::trace::processor::TraceProcessorSession;
use crate::trace::{Error, Result};

use super::models::*;

const ENTRIES_QUERY: &str = "SELECT id, ts FROM android_windowmanager ORDER BY ts";

fn args_query(entry_id: i64) -> String {
    format!(
        "SELECT args.key, args.display_value, args.value_type \
         FROM android_windowmanager AS wm \
         JOIN args ON wm.arg_set_id = args.arg_set_id \
         WHERE wm.id = {entry_id}"
    )
}

/// Parse every window manager snapshot out of the session's trace.
///
/// Each entry is decoded independently: one args query per entry, one state
/// per entry, ordered by elapsed timestamp.
pub fn parse_trace(session: &mut dyn TraceProcessorSession) -> Result<WindowManagerTrace> {
    let rows = session.query(ENTRIES_QUERY)?;
    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let id = row.must_int("id")?;
        let arg_rows = session.query(&args_query(id))?;
        let args = ArgsNode::from_rows(&arg_rows);
        let state = WindowManagerStateBuilder::new(&args).build()?;
        trace!(
            "decoded wm entry {} at {}ns ({} windows)",
            id,
            state.elapsed_timestamp_nanos,
            state.windows().len()
        );
        entries.push(state);
    }
    Ok(WindowManagerTrace::new(entries))
}

/// Builds a [WindowManagerState] from a decoded argument tree.
///
/// Every optional field is substituted with its type's zero value when
/// absent, so schema drift between trace versions never fails a parse. Only
/// the `window_manager_service` subtree and `elapsed_realtime_nanos` are
/// required.
pub struct WindowManagerStateBuilder<'a> {
    args: &'a ArgsNode,
}

impl<'a> WindowManagerStateBuilder<'a> {
    pub fn new(args: &'a ArgsNode) -> Self {
        Self { args }
    }

    pub fn build(&self) -> Result<WindowManagerState> {
        let service = self
            .args
            .child("window_manager_service")
            .ok_or_else(|| Error::MissingField("window_manager_service".into()))?;

        let elapsed = self
            .args
            .maybe_int("elapsed_realtime_nanos")
            .ok_or_else(|| Error::MissingField("elapsed_realtime_nanos".into()))?;

        let offset = self.args.get_int("real_to_elapsed_time_offset_nanos");

        let root = match service.descend("root_window_container") {
            Some(node) => build_base(node),
            None => empty_container(),
        };

        Ok(WindowManagerState {
            elapsed_timestamp_nanos: elapsed,
            clock_timestamp_nanos: elapsed + offset,
            policy: service
                .descend("policy")
                .map(build_policy)
                .unwrap_or_default(),
            focused_app: service.get_string("focused_app"),
            focused_display_id: service.get_int("focused_display_id") as i32,
            focused_window: service.get_string("focused_window.title"),
            keyguard: service
                .descend("keyguard_controller")
                .map(build_keyguard)
                .unwrap_or_default(),
            root,
        })
    }
}

fn build_policy(node: &ArgsNode) -> WindowManagerPolicy {
    WindowManagerPolicy {
        rotation: node.get_int("rotation") as i32,
        orientation: node.get_int("orientation") as i32,
        focused_app: node.get_string("focused_app"),
        screen_on_fully: node.get_bool("screen_on_fully"),
        keyguard_draw_complete: node.get_bool("keyguard_draw_complete"),
        window_manager_draw_complete: node.get_bool("window_manager_draw_complete"),
    }
}

fn build_keyguard(node: &ArgsNode) -> KeyguardState {
    let occluded_displays = node
        .children_named("keyguard_occluded_states")
        .into_iter()
        .filter(|s| s.get_bool("keyguard_occluded"))
        .map(|s| s.get_int("display_id") as i32)
        .collect();

    KeyguardState {
        keyguard_showing: node.get_bool("keyguard_showing"),
        aod_showing: node.get_bool("aod_showing"),
        occluded_displays,
    }
}

fn build_rect(node: &ArgsNode, path: &str) -> Rect {
    match node.descend(path) {
        Some(r) => Rect::new(
            r.get_int("left") as i32,
            r.get_int("top") as i32,
            r.get_int("right") as i32,
            r.get_int("bottom") as i32,
        ),
        None => Rect::default(),
    }
}

fn empty_container() -> WindowContainer {
    WindowContainer {
        title: String::new(),
        token: String::new(),
        visible: false,
        orientation: 0,
        kind: ContainerKind::Container,
        children: Vec::new(),
    }
}

/// Child keys checked when resolving a hierarchy node, in the declaration
/// order of [ContainerKind]. The first key present wins; a node can only
/// decode into one variant so ties cannot happen.
const CONTAINER_KEYS: [&str; 8] = [
    "display_content",
    "display_area",
    "task",
    "task_fragment",
    "activity",
    "window_token",
    "window",
    "window_container",
];

fn resolve_child(node: &ArgsNode) -> WindowContainer {
    for key in CONTAINER_KEYS {
        let variant = match node.child(key) {
            Some(v) => v,
            None => continue,
        };
        return match key {
            "display_content" => build_display_content(variant),
            "display_area" => build_display_area(variant),
            "task" => build_task(variant),
            "task_fragment" => build_task_fragment(variant),
            "activity" => build_activity(variant),
            "window_token" => build_window_token(variant),
            "window" => build_window(variant),
            _ => build_base(variant),
        };
    }
    // nothing resolvable, still not an error
    empty_container()
}

/// Fill the fields shared by every hierarchy node from its `window_container`
/// base message, recursing into children
fn build_base(node: &ArgsNode) -> WindowContainer {
    let base = node.child("window_container").unwrap_or(node);
    let children = base
        .children_named("children")
        .into_iter()
        .map(resolve_child)
        .collect();

    WindowContainer {
        title: base.get_string("identifier.title"),
        token: format!("{:x}", base.get_int("identifier.hash_code")),
        visible: base.get_bool("visible"),
        orientation: base.get_int("orientation") as i32,
        kind: ContainerKind::Container,
        children,
    }
}

fn build_display_content(node: &ArgsNode) -> WindowContainer {
    let mut container = build_base(node);
    container.kind = ContainerKind::DisplayContent {
        display_id: node.get_int("id") as i32,
        logical_width: node.get_int("display_info.logical_width") as i32,
        logical_height: node.get_int("display_info.logical_height") as i32,
        focused_root_task_id: node.get_int("focused_root_task_id") as i32,
    };
    if container.title.is_empty() {
        container.title = node.get_string("display_info.name");
    }
    container
}

fn build_display_area(node: &ArgsNode) -> WindowContainer {
    let mut container = build_base(node);
    container.kind = ContainerKind::DisplayArea {
        is_task_display_area: node.get_bool("is_task_display_area"),
        is_root_display_area: node.get_bool("is_root_display_area"),
    };
    if container.title.is_empty() {
        container.title = node.get_string("name");
    }
    container
}

fn build_task(node: &ArgsNode) -> WindowContainer {
    let mut container = build_base(node);
    container.kind = ContainerKind::Task {
        id: node.get_int("id") as i32,
        activity_type: node.get_int("activity_type") as i32,
        bounds: build_rect(node, "bounds"),
    };
    container
}

fn build_task_fragment(node: &ArgsNode) -> WindowContainer {
    let mut container = build_base(node);
    container.kind = ContainerKind::TaskFragment {
        activity_type: node.get_int("activity_type") as i32,
        display_id: node.get_int("display_id") as i32,
    };
    container
}

fn build_activity(node: &ArgsNode) -> WindowContainer {
    let mut container = build_base(node);
    container.kind = ContainerKind::Activity {
        name: node.get_string("name"),
        state: node.get_string("state"),
        proc_id: node.get_int("proc_id") as i32,
        translucent: node.get_bool("translucent"),
        front_of_task: node.get_bool("front_of_task"),
    };
    if container.title.is_empty() {
        container.title = node.get_string("name");
    }
    container
}

fn build_window_token(node: &ArgsNode) -> WindowContainer {
    let mut container = build_base(node);
    container.kind = ContainerKind::WindowToken;
    container
}

fn build_window(node: &ArgsNode) -> WindowContainer {
    let mut container = build_base(node);
    container.kind = ContainerKind::WindowState {
        window_type: node.get_int("attributes.type") as i32,
        flags: node.get_int("attributes.flags") as i32,
        frame: build_rect(node, "window_frames.frame"),
        requested_width: node.get_int("requested_width") as i32,
        requested_height: node.get_int("requested_height") as i32,
        surface_shown: node.get_bool("is_surface_shown"),
        layer: node.get_int("animator.surface.layer") as i32,
    };
    container
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trace::args::ArgValue;

    fn minimal_args() -> ArgsNode {
        let mut args = ArgsNode::root();
        args.insert("elapsed_realtime_nanos", Some(ArgValue::Int(1000)));
        args.insert(
            "window_manager_service.focused_app",
            Some(ArgValue::Str("com.example/.Main".into())),
        );
        args
    }

    #[test]
    fn test_build_minimal_state() {
        let args = minimal_args();
        let state = WindowManagerStateBuilder::new(&args).build().expect("build");
        assert_eq!(state.elapsed_timestamp_nanos, 1000);
        assert_eq!(state.clock_timestamp_nanos, 1000);
        assert_eq!(state.focused_app, "com.example/.Main");
        // everything else is defaulted, not an error
        assert_eq!(state.policy.rotation, 0);
        assert!(!state.is_keyguard_showing());
        assert!(state.windows().is_empty());
    }

    #[test]
    fn test_missing_service_is_hard_error() {
        let mut args = ArgsNode::root();
        args.insert("elapsed_realtime_nanos", Some(ArgValue::Int(1)));
        let err = WindowManagerStateBuilder::new(&args)
            .build()
            .expect_err("no window_manager_service");
        assert!(err.to_string().contains("window_manager_service"));
    }

    #[test]
    fn test_missing_elapsed_is_hard_error() {
        let mut args = ArgsNode::root();
        args.insert("window_manager_service.focused_app", None);
        let err = WindowManagerStateBuilder::new(&args)
            .build()
            .expect_err("no elapsed_realtime_nanos");
        assert!(err.to_string().contains("elapsed_realtime_nanos"));
    }

    #[test]
    fn test_clock_timestamp_offset() {
        let mut args = minimal_args();
        args.insert(
            "real_to_elapsed_time_offset_nanos",
            Some(ArgValue::Int(500)),
        );
        let state = WindowManagerStateBuilder::new(&args).build().expect("build");
        assert_eq!(state.clock_timestamp_nanos, 1500);
    }

    fn hierarchy_args() -> ArgsNode {
        let mut args = minimal_args();
        let root = "window_manager_service.root_window_container.window_container";
        args.insert(
            &format!("{root}.identifier.title"),
            Some(ArgValue::Str("ROOT".into())),
        );
        // a task that also carries an unused generic base next to it
        let task = format!("{root}.children[0].task");
        args.insert(&format!("{task}.id"), Some(ArgValue::Int(7)));
        args.insert(&format!("{task}.activity_type"), Some(ArgValue::Int(1)));
        args.insert(&format!("{task}.bounds.right"), Some(ArgValue::Int(1080)));
        args.insert(&format!("{task}.bounds.bottom"), Some(ArgValue::Int(2400)));
        let act = format!("{task}.window_container.children[0].activity");
        args.insert(
            &format!("{act}.name"),
            Some(ArgValue::Str("com.example/.Main".into())),
        );
        args.insert(&format!("{act}.state"), Some(ArgValue::Str("RESUMED".into())));
        let win = format!("{act}.window_container.children[0].window");
        args.insert(
            &format!("{win}.window_container.identifier.title"),
            Some(ArgValue::Str("com.example/.Main".into())),
        );
        args.insert(
            &format!("{win}.window_container.visible"),
            Some(ArgValue::Bool(true)),
        );
        args.insert(&format!("{win}.is_surface_shown"), Some(ArgValue::Bool(true)));
        args.insert(
            &format!("{win}.window_frames.frame.right"),
            Some(ArgValue::Int(1080)),
        );
        args.insert(
            &format!("{win}.window_frames.frame.bottom"),
            Some(ArgValue::Int(2400)),
        );
        args
    }

    #[test]
    fn test_build_hierarchy() {
        let args = hierarchy_args();
        let state = WindowManagerStateBuilder::new(&args).build().expect("build");

        assert_eq!(state.root.title, "ROOT");
        assert_eq!(state.root.children.len(), 1);

        let task = &state.root.children[0];
        match &task.kind {
            ContainerKind::Task { id, bounds, .. } => {
                assert_eq!(*id, 7);
                assert_eq!(bounds.width(), 1080);
            }
            other => panic!("expected a task, got {}", other.name()),
        }

        let windows = state.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].title, "com.example/.Main");
        assert!(windows[0].visible);

        let app_windows = state.app_windows();
        assert_eq!(app_windows.len(), 1);
        assert_eq!(
            state.top_visible_app_window().map(|w| w.title.as_str()),
            Some("com.example/.Main")
        );
    }

    #[test]
    fn test_parse_trace_decodes_every_entry() {
        use crate::testing::MockTraceProcessor;
        use crate::trace::processor::{CellValue, QueryRow};

        fn entry_row(id: i64, ts: i64) -> QueryRow {
            QueryRow::new(vec![
                ("id".into(), CellValue::Int(id)),
                ("ts".into(), CellValue::Int(ts)),
            ])
        }

        fn arg_row(key: &str, display: &str, value_type: &str) -> QueryRow {
            QueryRow::new(vec![
                ("key".into(), CellValue::Str(key.into())),
                ("display_value".into(), CellValue::from_raw(display)),
                ("value_type".into(), CellValue::Str(value_type.into())),
            ])
        }

        let mut session = MockTraceProcessor::new();
        session.expect_query().returning(|sql: &str| {
            if sql.starts_with("SELECT id, ts FROM android_windowmanager") {
                Ok(vec![entry_row(1, 100), entry_row(2, 200)])
            } else if sql.contains("WHERE wm.id = 1") {
                Ok(vec![
                    arg_row("elapsed_realtime_nanos", "100", "int"),
                    arg_row("window_manager_service.focused_app", "com.a/.Main", "string"),
                ])
            } else if sql.contains("WHERE wm.id = 2") {
                Ok(vec![
                    arg_row("elapsed_realtime_nanos", "200", "int"),
                    arg_row("window_manager_service.focused_app", "com.b/.Main", "string"),
                ])
            } else {
                Ok(Vec::new())
            }
        });

        let trace = parse_trace(&mut session).expect("parse");
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.entries()[0].focused_app, "com.a/.Main");
        assert_eq!(trace.entries()[1].elapsed_timestamp_nanos, 200);
    }

    #[test]
    fn test_variant_precedence_order() {
        // a node carrying both a task and a generic container resolves as the
        // task because task comes first in the precedence order
        let mut args = minimal_args();
        let child = "window_manager_service.root_window_container.window_container.children[0]";
        args.insert(&format!("{child}.window_container.visible"), Some(ArgValue::Bool(true)));
        args.insert(&format!("{child}.task.id"), Some(ArgValue::Int(3)));

        let state = WindowManagerStateBuilder::new(&args).build().expect("build");
        let resolved = &state.root.children[0];
        assert!(matches!(resolved.kind, ContainerKind::Task { id: 3, .. }));
    }
}
