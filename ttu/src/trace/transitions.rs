use itertools::Itertools;
use log::debug;

use crate::trace::args::ArgsNode;
use crate::trace::processor::TraceProcessorSession;
use crate::trace::{Error, Result};

const TRANSITIONS_QUERY: &str =
    "SELECT wmst.transition_id AS transition_entry_id, args.key, args.display_value, args.value_type \
     FROM window_manager_shell_transitions AS wmst \
     JOIN args ON wmst.arg_set_id = args.arg_set_id";

const HANDLERS_QUERY: &str =
    "SELECT handler_id, handler_name FROM window_manager_shell_transition_handlers";

/// One per-window/per-layer change inside a transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionChange {
    pub mode: i32,
    pub layer_id: i32,
    pub window_id: i32,
}

/// One window manager / shell transition record.
///
/// All timestamp fields treat a raw `0` as unset: a real event recorded at
/// elapsed time zero is indistinguishable from a field that was never
/// written.
#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub id: i64,
    pub transition_type: i32,
    pub flags: i32,

    // WM-side timing
    pub create_time: Option<i64>,
    pub send_time: Option<i64>,
    pub finish_time: Option<i64>,

    // shell-side timing
    pub dispatch_time: Option<i64>,
    pub merge_request_time: Option<i64>,
    pub merge_time: Option<i64>,
    pub abort_time: Option<i64>,

    pub handler: Option<String>,
    pub changes: Vec<TransitionChange>,
}

impl Transition {
    pub fn is_aborted(&self) -> bool {
        self.abort_time.is_some()
    }

    pub fn is_merged(&self) -> bool {
        self.merge_time.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some() && !self.is_aborted()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransitionsTrace {
    transitions: Vec<Transition>,
}

impl TransitionsTrace {
    pub fn new(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }
}

// 0 means unset
fn ts_or_unset(raw: i64) -> Option<i64> {
    if raw == 0 {
        None
    } else {
        Some(raw)
    }
}

fn build_transition(
    args: &ArgsNode,
    handlers: &std::collections::HashMap<i64, String>,
) -> Result<Transition> {
    let id = args
        .maybe_int("id")
        .ok_or_else(|| Error::MissingField("id".into()))?;

    let changes = args
        .children_named("targets")
        .into_iter()
        .map(|t| TransitionChange {
            mode: t.get_int("mode") as i32,
            layer_id: t.get_int("layer_id") as i32,
            window_id: t.get_int("window_id") as i32,
        })
        .collect();

    Ok(Transition {
        id,
        transition_type: args.get_int("type") as i32,
        flags: args.get_int("flags") as i32,
        create_time: ts_or_unset(args.get_int("create_time_ns")),
        send_time: ts_or_unset(args.get_int("send_time_ns")),
        finish_time: ts_or_unset(args.get_int("finish_time_ns")),
        dispatch_time: ts_or_unset(args.get_int("dispatch_time_ns")),
        merge_request_time: ts_or_unset(args.get_int("merge_request_time_ns")),
        merge_time: ts_or_unset(args.get_int("merge_time_ns")),
        abort_time: ts_or_unset(args.get_int("abort_time_ns")),
        handler: handlers.get(&args.get_int("handler")).cloned(),
        changes,
    })
}

/// Parse every shell transition out of the session's trace, grouping the
/// flattened argument rows by their `transition_entry_id`
pub fn parse_trace(session: &mut dyn TraceProcessorSession) -> Result<TransitionsTrace> {
    let handlers: std::collections::HashMap<i64, String> = match session.query(HANDLERS_QUERY) {
        Ok(rows) => rows
            .iter()
            .filter_map(|r| {
                let id = r.maybe_int("handler_id")?;
                let name = r.maybe_str("handler_name")?;
                Some((id, name.to_string()))
            })
            .collect(),
        Err(e) => {
            debug!("no transition handlers available: {}", e);
            Default::default()
        }
    };

    let rows = session.query(TRANSITIONS_QUERY)?;
    let grouped = rows
        .iter()
        .filter_map(|r| {
            r.maybe_int("transition_entry_id")
                .map(|id| (id, r.clone()))
        })
        .into_group_map();

    let mut transitions = Vec::with_capacity(grouped.len());
    for entry_id in grouped.keys().sorted() {
        let args = ArgsNode::from_rows(&grouped[entry_id]);
        transitions.push(build_transition(&args, &handlers)?);
    }

    Ok(TransitionsTrace::new(transitions))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trace::args::ArgValue;

    fn transition_args() -> ArgsNode {
        let mut args = ArgsNode::root();
        args.insert("id", Some(ArgValue::Int(12)));
        args.insert("type", Some(ArgValue::Int(1)));
        args.insert("create_time_ns", Some(ArgValue::Int(100)));
        args.insert("send_time_ns", Some(ArgValue::Int(200)));
        args.insert("finish_time_ns", Some(ArgValue::Int(0)));
        args.insert("targets[0].mode", Some(ArgValue::Int(1)));
        args.insert("targets[0].layer_id", Some(ArgValue::Int(42)));
        args.insert("targets[1].mode", Some(ArgValue::Int(2)));
        args.insert("targets[1].window_id", Some(ArgValue::Int(7)));
        args
    }

    #[test]
    fn test_build_transition() {
        let args = transition_args();
        let t = build_transition(&args, &Default::default()).expect("build");
        assert_eq!(t.id, 12);
        assert_eq!(t.transition_type, 1);
        assert_eq!(t.create_time, Some(100));
        assert_eq!(t.send_time, Some(200));
        assert_eq!(t.changes.len(), 2);
        assert_eq!(t.changes[0].layer_id, 42);
        assert_eq!(t.changes[1].window_id, 7);
    }

    #[test]
    fn test_zero_timestamps_are_unset() {
        let args = transition_args();
        let t = build_transition(&args, &Default::default()).expect("build");
        // finish_time_ns was literally 0 in the trace
        assert_eq!(t.finish_time, None);
        // fields never written at all look exactly the same
        assert_eq!(t.abort_time, None);
        assert!(!t.is_finished());
        assert!(!t.is_aborted());
    }

    #[test]
    fn test_missing_id_is_hard_error() {
        let mut args = ArgsNode::root();
        args.insert("type", Some(ArgValue::Int(1)));
        let err = build_transition(&args, &Default::default()).expect_err("no id");
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_parse_trace_groups_by_entry_id() {
        use crate::testing::MockTraceProcessor;
        use crate::trace::processor::{CellValue, QueryRow};

        fn arg_row(entry_id: i64, key: &str, display: &str, value_type: &str) -> QueryRow {
            QueryRow::new(vec![
                ("transition_entry_id".into(), CellValue::Int(entry_id)),
                ("key".into(), CellValue::Str(key.into())),
                ("display_value".into(), CellValue::from_raw(display)),
                ("value_type".into(), CellValue::Str(value_type.into())),
            ])
        }

        let mut session = MockTraceProcessor::new();
        session.expect_query().returning(|sql: &str| {
            if sql.contains("window_manager_shell_transition_handlers") {
                Ok(vec![QueryRow::new(vec![
                    ("handler_id".into(), CellValue::Int(1)),
                    (
                        "handler_name".into(),
                        CellValue::Str("DefaultMixedHandler".into()),
                    ),
                ])])
            } else {
                Ok(vec![
                    arg_row(10, "id", "31", "int"),
                    arg_row(10, "create_time_ns", "100", "int"),
                    arg_row(10, "handler", "1", "int"),
                    arg_row(11, "id", "32", "int"),
                    arg_row(11, "send_time_ns", "300", "int"),
                ])
            }
        });

        let trace = parse_trace(&mut session).expect("parse");
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.transitions()[0].id, 31);
        assert_eq!(
            trace.transitions()[0].handler.as_deref(),
            Some("DefaultMixedHandler")
        );
        assert_eq!(trace.transitions()[1].id, 32);
        assert_eq!(trace.transitions()[1].send_time, Some(300));
    }

    #[test]
    fn test_handler_resolution() {
        let mut args = transition_args();
        args.insert("handler", Some(ArgValue::Int(2)));
        let mut handlers = std::collections::HashMap::new();
        handlers.insert(2i64, "DefaultTransitionHandler".to_string());
        let t = build_transition(&args, &handlers).expect("build");
        assert_eq!(t.handler.as_deref(), Some("DefaultTransitionHandler"));
    }
}
