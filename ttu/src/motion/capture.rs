use std::collections::BTreeMap;
use std::fmt::Display;

use super::datapoint::{DataPoint, FeatureValue};
use super::{Error, Result};

/// One node of a UI snapshot, carrying the values its component exported for
/// testing
#[derive(Debug, Clone, Default)]
pub struct UiNode {
    name: String,
    exported: BTreeMap<String, FeatureValue>,
    children: Vec<UiNode>,
}

impl UiNode {
    pub fn new<N: AsRef<str>>(name: N) -> Self {
        Self {
            name: name.as_ref().into(),
            exported: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_value<K: AsRef<str>>(mut self, key: K, value: FeatureValue) -> Self {
        self.exported.insert(key.as_ref().into(), value);
        self
    }

    pub fn with_child(mut self, child: UiNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exported_value(&self, key: &str) -> Option<&FeatureValue> {
        self.exported.get(key)
    }

    pub fn children(&self) -> &[UiNode] {
        &self.children
    }

    fn collect<'a>(&'a self, into: &mut Vec<&'a UiNode>) {
        into.push(self);
        for child in &self.children {
            child.collect(into);
        }
    }
}

/// The UI tree visible at one sampled frame
#[derive(Debug, Clone, Default)]
pub struct UiSnapshot {
    roots: Vec<UiNode>,
}

impl UiSnapshot {
    pub fn new(roots: Vec<UiNode>) -> Self {
        Self { roots }
    }

    pub fn nodes(&self) -> Vec<&UiNode> {
        let mut all = Vec::new();
        for root in &self.roots {
            root.collect(&mut all);
        }
        all
    }

    pub fn find_all(&self, matcher: &NodeMatcher) -> Vec<&UiNode> {
        self.nodes()
            .into_iter()
            .filter(|n| matcher.matches(n))
            .collect()
    }
}

/// Selects nodes of a snapshot by name
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMatcher {
    name: String,
}

impl NodeMatcher {
    pub fn by_name<N: AsRef<str>>(name: N) -> Self {
        Self {
            name: name.as_ref().into(),
        }
    }

    pub fn matches(&self, node: &UiNode) -> bool {
        node.name == self.name
    }
}

impl Display for NodeMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node `{}`", self.name)
    }
}

/// Read the value a single matching node exported for `key`.
///
/// This is the strict path: every way the read can come up empty is a
/// distinct error. Captures that should tolerate a missing target use
/// [FeatureCapture::by_value_key] instead.
pub fn read_exported_value(
    snapshot: &UiSnapshot,
    matcher: &NodeMatcher,
    key: &str,
) -> Result<FeatureValue> {
    let matches = snapshot.find_all(matcher);
    match matches.len() {
        0 => Err(Error::NodeNotFound(matcher.to_string())),
        1 => {
            let node = matches[0];
            node.exported_value(key)
                .cloned()
                .ok_or_else(|| Error::ValueNotExported {
                    node: node.name.clone(),
                    key: key.into(),
                })
        }
        count => Err(Error::AmbiguousNode {
            matcher: matcher.to_string(),
            count,
        }),
    }
}

/// Produces one named data point per sampled frame
pub struct FeatureCapture {
    name: String,
    capture: Box<dyn Fn(&UiSnapshot) -> DataPoint>,
}

impl FeatureCapture {
    pub fn new<N, F>(name: N, capture: F) -> Self
    where
        N: AsRef<str>,
        F: Fn(&UiSnapshot) -> DataPoint + 'static,
    {
        Self {
            name: name.as_ref().into(),
            capture: Box::new(capture),
        }
    }

    /// Capture the value a node exports for `key`. Zero matches, several
    /// matches and a missing key all record as [DataPoint::NotFound] so an
    /// intermittently absent node never aborts the recording.
    pub fn by_value_key<N: AsRef<str>, K: AsRef<str>>(
        name: N,
        matcher: NodeMatcher,
        key: K,
    ) -> Self {
        let key = key.as_ref().to_string();
        Self::new(name, move |snapshot| {
            let matches = snapshot.find_all(&matcher);
            if matches.len() != 1 {
                return DataPoint::NotFound;
            }
            match matches[0].exported_value(&key) {
                Some(value) => DataPoint::Value(value.clone()),
                None => DataPoint::NotFound,
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capture(&self, snapshot: &UiSnapshot) -> DataPoint {
        (self.capture)(snapshot)
    }
}
