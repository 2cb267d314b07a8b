use std::collections::BTreeMap;

use log::trace;

use crate::trace::args::ArgsNode;
use crate::trace::processor::{QueryRow, TraceProcessorSession};
use crate::trace::windowmanager::Rect;
use crate::trace::{Result, TraceEntry};

const SNAPSHOTS_QUERY: &str = "SELECT id, ts FROM surfaceflinger_layers_snapshot ORDER BY ts";

fn layers_query(snapshot_id: i64) -> String {
    format!(
        "SELECT sfl.id AS layer_id, args.key, args.display_value, args.value_type \
         FROM surfaceflinger_layer AS sfl \
         JOIN args ON sfl.arg_set_id = args.arg_set_id \
         WHERE sfl.snapshot_id = {snapshot_id}"
    )
}

/// One surface in a surface flinger snapshot. Layers come out of the trace as
/// a flat table and stay flat; the hierarchy is re-linked through `parent_id`.
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: i32,
    /// -1 when the layer has no parent
    pub parent_id: i32,
    pub name: String,
    pub z: i32,
    pub visible: bool,
    pub bounds: Rect,
    pub opacity: f64,
}

impl Layer {
    pub fn is_root(&self) -> bool {
        self.parent_id < 0
    }
}

/// All layers composing the screen at one point in time
#[derive(Debug, Clone)]
pub struct LayerTraceEntry {
    pub elapsed_timestamp_nanos: i64,
    layers: Vec<Layer>,
}

impl LayerTraceEntry {
    pub fn new(elapsed_timestamp_nanos: i64, mut layers: Vec<Layer>) -> Self {
        // draw order: lowest z first
        layers.sort_by_key(|l| l.z);
        Self {
            elapsed_timestamp_nanos,
            layers,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn visible_layers(&self) -> Vec<&Layer> {
        self.layers.iter().filter(|l| l.visible).collect()
    }

    pub fn roots(&self) -> Vec<&Layer> {
        self.layers.iter().filter(|l| l.is_root()).collect()
    }

    pub fn children_of(&self, id: i32) -> Vec<&Layer> {
        self.layers.iter().filter(|l| l.parent_id == id).collect()
    }

    pub fn find_by_name(&self, needle: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name.contains(needle))
    }
}

impl TraceEntry for LayerTraceEntry {
    fn elapsed_timestamp_nanos(&self) -> i64 {
        self.elapsed_timestamp_nanos
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayersTrace {
    entries: Vec<LayerTraceEntry>,
}

impl LayersTrace {
    pub fn new(entries: Vec<LayerTraceEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LayerTraceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn build_layer(args: &ArgsNode) -> Layer {
    Layer {
        id: args.get_int("id") as i32,
        parent_id: args.maybe_int("parent").unwrap_or(-1) as i32,
        name: args.get_string("name"),
        z: args.get_int("z") as i32,
        visible: args.get_bool("is_visible"),
        bounds: Rect::new(
            args.get_int("bounds.left") as i32,
            args.get_int("bounds.top") as i32,
            args.get_int("bounds.right") as i32,
            args.get_int("bounds.bottom") as i32,
        ),
        opacity: args.get_real("opacity"),
    }
}

/// Group per-layer argument rows by the `layer_id` column and decode each
/// group through its own args tree
fn build_snapshot(elapsed: i64, rows: &[QueryRow]) -> LayerTraceEntry {
    let mut grouped: BTreeMap<i64, Vec<QueryRow>> = BTreeMap::new();
    for row in rows {
        let layer_id = match row.maybe_int("layer_id") {
            Some(v) => v,
            None => continue,
        };
        grouped.entry(layer_id).or_default().push(row.clone());
    }

    let layers = grouped
        .values()
        .map(|rows| build_layer(&ArgsNode::from_rows(rows)))
        .collect();

    LayerTraceEntry::new(elapsed, layers)
}

/// Parse every surface flinger snapshot out of the session's trace
pub fn parse_trace(session: &mut dyn TraceProcessorSession) -> Result<LayersTrace> {
    let rows = session.query(SNAPSHOTS_QUERY)?;
    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let id = row.must_int("id")?;
        let ts = row.must_int("ts")?;
        let layer_rows = session.query(&layers_query(id))?;
        let entry = build_snapshot(ts, &layer_rows);
        trace!(
            "decoded sf snapshot {} at {}ns ({} layers)",
            id,
            ts,
            entry.layers().len()
        );
        entries.push(entry);
    }
    Ok(LayersTrace::new(entries))
}
