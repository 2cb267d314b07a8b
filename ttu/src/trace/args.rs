use super::processor::QueryRow;

/// A typed scalar decoded from the trace processor's `args` table
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
}

impl ArgValue {
    /// Re-type a display value using the `value_type` column of the `args`
    /// table. Unknown value types fall back to strings; `null` yields no
    /// value at all.
    pub fn from_display(value_type: &str, display: &str) -> Option<Self> {
        match value_type {
            "int" | "uint" | "pointer" => {
                let parsed = display
                    .parse::<i64>()
                    .or_else(|_| display.parse::<u64>().map(|v| v as i64));
                Some(Self::Int(parsed.unwrap_or(0)))
            }
            "real" => Some(Self::Real(display.parse::<f64>().unwrap_or(0.0))),
            "bool" => Some(Self::Bool(display == "true" || display == "1")),
            "null" => None,
            _ => Some(Self::Str(display.into())),
        }
    }
}

/// One node of the decoded argument tree.
///
/// The tree is the intermediate representation between the trace processor's
/// flattened key/value rows and the typed state objects: each dotted path
/// segment becomes a node, `foo[2]` segments become the third `foo` child.
/// Built once per query result and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ArgsNode {
    key: String,
    index: Option<usize>,
    value: Option<ArgValue>,
    children: Vec<ArgsNode>,
}

/// A path segment: a key plus an optional `[idx]` suffix
fn split_segment(segment: &str) -> (&str, Option<usize>) {
    if let Some(open) = segment.find('[') {
        if segment.ends_with(']') {
            let idx = segment[open + 1..segment.len() - 1].parse::<usize>().ok();
            if idx.is_some() {
                return (&segment[..open], idx);
            }
        }
    }
    (segment, None)
}

impl ArgsNode {
    pub fn root() -> Self {
        Self::default()
    }

    /// Build an args tree from `(key, display_value, value_type)` rows, the
    /// shape produced by joining a winscope table against `args` on
    /// `arg_set_id`.
    pub fn from_rows(rows: &[QueryRow]) -> Self {
        let mut root = Self::root();
        for row in rows {
            let key = match row.maybe_str("key") {
                Some(k) => k,
                None => continue,
            };
            let value_type = row.maybe_str("value_type").unwrap_or("string");
            let display = row.display("display_value").unwrap_or_default();
            root.insert(key, ArgValue::from_display(value_type, &display));
        }
        root
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn value(&self) -> Option<&ArgValue> {
        self.value.as_ref()
    }

    pub fn children(&self) -> &[ArgsNode] {
        &self.children
    }

    /// Insert a value at the given dotted path, creating intermediate nodes
    pub fn insert(&mut self, path: &str, value: Option<ArgValue>) {
        let mut node = self;
        for segment in path.split('.') {
            let (key, index) = split_segment(segment);
            let pos = node
                .children
                .iter()
                .position(|c| c.key == key && c.index == index);
            let pos = match pos {
                Some(p) => p,
                None => {
                    node.children.push(ArgsNode {
                        key: key.into(),
                        index,
                        value: None,
                        children: Vec::new(),
                    });
                    node.children.len() - 1
                }
            };
            node = &mut node.children[pos];
        }
        node.value = value;
    }

    /// First child with the given key
    pub fn child(&self, key: &str) -> Option<&ArgsNode> {
        self.children.iter().find(|c| c.key == key)
    }

    pub fn has_child(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    /// All children with the given key, ordered by their `[idx]` suffix
    pub fn children_named(&self, key: &str) -> Vec<&ArgsNode> {
        let mut named: Vec<&ArgsNode> = self.children.iter().filter(|c| c.key == key).collect();
        named.sort_by_key(|c| c.index.unwrap_or(0));
        named
    }

    /// Walk a dotted path below this node
    pub fn descend(&self, path: &str) -> Option<&ArgsNode> {
        let mut node = self;
        for segment in path.split('.') {
            let (key, index) = split_segment(segment);
            node = node
                .children
                .iter()
                .find(|c| c.key == key && (index.is_none() || c.index == index))?;
        }
        Some(node)
    }

    pub fn maybe_int(&self, key: &str) -> Option<i64> {
        match self.descend(key)?.value.as_ref()? {
            ArgValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn maybe_real(&self, key: &str) -> Option<f64> {
        match self.descend(key)?.value.as_ref()? {
            ArgValue::Real(v) => Some(*v),
            ArgValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn maybe_bool(&self, key: &str) -> Option<bool> {
        match self.descend(key)?.value.as_ref()? {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn maybe_str(&self, key: &str) -> Option<&str> {
        match self.descend(key)?.value.as_ref()? {
            ArgValue::Str(v) => Some(v),
            _ => None,
        }
    }

    // Absent fields never fail a parse: every typed read below substitutes
    // the type's zero value instead.

    pub fn get_int(&self, key: &str) -> i64 {
        self.maybe_int(key).unwrap_or(0)
    }

    pub fn get_real(&self, key: &str) -> f64 {
        self.maybe_real(key).unwrap_or(0.0)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.maybe_bool(key).unwrap_or(false)
    }

    pub fn get_str(&self, key: &str) -> &str {
        self.maybe_str(key).unwrap_or("")
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_str(key).to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trace::processor::CellValue;

    fn arg_row(key: &str, display: &str, value_type: &str) -> QueryRow {
        QueryRow::new(vec![
            ("key".into(), CellValue::Str(key.into())),
            ("display_value".into(), CellValue::from_raw(display)),
            ("value_type".into(), CellValue::Str(value_type.into())),
        ])
    }

    #[test]
    fn test_split_segment() {
        assert_eq!(split_segment("children[2]"), ("children", Some(2)));
        assert_eq!(split_segment("policy"), ("policy", None));
        assert_eq!(split_segment("weird[]"), ("weird[]", None));
    }

    #[test]
    fn test_build_tree_from_rows() {
        let rows = vec![
            arg_row("policy.rotation", "3", "int"),
            arg_row("policy.focused_app", "com.android.launcher", "string"),
            arg_row("root.children[1].title", "second", "string"),
            arg_row("root.children[0].title", "first", "string"),
            arg_row("root.children[0].visible", "true", "bool"),
        ];

        let tree = ArgsNode::from_rows(&rows);

        assert_eq!(tree.get_int("policy.rotation"), 3);
        assert_eq!(tree.get_str("policy.focused_app"), "com.android.launcher");

        let root = tree.child("root").expect("root child");
        let children = root.children_named("children");
        assert_eq!(children.len(), 2);
        // index order wins over insertion order
        assert_eq!(children[0].get_str("title"), "first");
        assert_eq!(children[1].get_str("title"), "second");
        assert!(children[0].get_bool("visible"));
    }

    #[test]
    fn test_missing_fields_are_defaulted() {
        let tree = ArgsNode::from_rows(&[arg_row("a.b", "1", "int")]);
        assert_eq!(tree.get_int("a.missing"), 0);
        assert_eq!(tree.get_str("nope"), "");
        assert!(!tree.get_bool("a.b.c.d"));
        assert_eq!(tree.get_real("x"), 0.0);
    }

    #[test]
    fn test_type_mismatch_is_defaulted() {
        let tree = ArgsNode::from_rows(&[arg_row("a", "hello", "string")]);
        assert_eq!(tree.get_int("a"), 0);
        assert_eq!(tree.get_str("a"), "hello");
    }

    #[test]
    fn test_null_value_type_has_no_value() {
        let tree = ArgsNode::from_rows(&[arg_row("a.b", "", "null")]);
        // the node exists but carries no value
        assert!(tree.descend("a.b").is_some());
        assert!(tree.descend("a.b").unwrap().value().is_none());
        assert_eq!(tree.get_int("a.b"), 0);
    }
}
