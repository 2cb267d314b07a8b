use std::io::Write;
use std::path::{Path, PathBuf};

use crate::command::run_cmd;
use crate::config::{ProjectConfig, TraceProcessorConfig};
use crate::utils::path_must_str;
use crate::Context;

use super::{Error, Result};

/// One cell of a query result.
///
/// The trace processor prints everything as text, so cells are re-typed on
/// read: anything that parses as an integer is an [CellValue::Int], anything
/// that parses as a float is a [CellValue::Real], the literal `[NULL]` is
/// [CellValue::Null] and the rest stays a string.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Real(f64),
    Str(String),
    Null,
}

impl CellValue {
    pub fn from_raw(raw: &str) -> Self {
        if raw == "[NULL]" {
            return Self::Null;
        }
        if let Ok(v) = raw.parse::<i64>() {
            return Self::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return Self::Real(v);
        }
        Self::Str(raw.into())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// One row of a query result: ordered (column, value) pairs
#[derive(Debug, Clone)]
pub struct QueryRow {
    cells: Vec<(String, CellValue)>,
}

impl QueryRow {
    pub fn new(cells: Vec<(String, CellValue)>) -> Self {
        Self { cells }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn maybe_int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(|v| v.as_int())
    }

    pub fn maybe_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(|v| v.as_str())
    }

    /// Get an int column, raising a [Error::MissingField] naming the column
    /// when it is absent or null
    pub fn must_int(&self, column: &str) -> Result<i64> {
        self.maybe_int(column)
            .ok_or_else(|| Error::MissingField(column.into()))
    }

    /// The raw string form of a cell, regardless of its detected type
    pub fn display(&self, column: &str) -> Option<String> {
        self.get(column).map(|v| match v {
            CellValue::Int(i) => i.to_string(),
            CellValue::Real(r) => r.to_string(),
            CellValue::Str(s) => s.clone(),
            CellValue::Null => String::new(),
        })
    }
}

/// A query engine instance loaded with one decoded trace.
///
/// Sessions are cheap to create and are never shared across parses: every
/// parse call opens its own session over the trace file.
pub trait TraceProcessorSession {
    fn query(&mut self, sql: &str) -> Result<Vec<QueryRow>>;
}

/// A [TraceProcessorSession] implementation that invokes the external
/// `trace_processor_shell` binary for every query.
pub struct ExecTraceProcessor {
    bin: String,
    trace: PathBuf,
}

impl ExecTraceProcessor {
    /// Creates a new `ExecTraceProcessor` from the given context.
    ///
    /// This will first check the project config file for a trace processor
    /// entry:
    ///
    /// [trace-processor]
    /// executable = "..."
    /// can-exec = true
    ///
    /// and use that if found. If the config file exists and doesn't have that
    /// entry, the binary is looked up via the context. `can-exec = false` in
    /// the config makes this function fail. Note that `can-exec` defaults to
    /// true.
    pub fn new(ctx: &dyn Context, trace: &Path) -> crate::Result<Self> {
        match ctx.get_project_config()? {
            Some(cfg) => {
                let proj = ProjectConfig::from_config(cfg)?;
                Self::from_tp_config(ctx, &proj.trace_processor, trace)
            }
            None => Self::from_env(ctx, trace),
        }
    }

    pub fn from_env(ctx: &dyn Context, trace: &Path) -> crate::Result<Self> {
        let bin = ctx.get_bin("trace_processor_shell")?;
        Ok(Self {
            bin,
            trace: trace.into(),
        })
    }

    fn from_tp_config(
        ctx: &dyn Context,
        cfg: &TraceProcessorConfig,
        trace: &Path,
    ) -> crate::Result<Self> {
        if !cfg.can_exec {
            return Err(crate::Error::TraceProcessorDisabled);
        }
        let bin = match &cfg.executable {
            Some(v) => v.clone(),
            None => ctx.get_bin("trace_processor_shell")?,
        };
        Ok(Self {
            bin,
            trace: trace.into(),
        })
    }

    fn parse_output(&self, raw: &[u8]) -> Result<Vec<QueryRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(raw);

        let headers = reader
            .headers()
            .map_err(|e| Error::MalformedOutput(e.to_string()))?
            .clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::MalformedOutput(e.to_string()))?;
            let cells = headers
                .iter()
                .zip(record.iter())
                .map(|(name, raw)| (name.to_string(), CellValue::from_raw(raw)))
                .collect();
            rows.push(QueryRow::new(cells));
        }
        Ok(rows)
    }
}

impl TraceProcessorSession for ExecTraceProcessor {
    fn query(&mut self, sql: &str) -> Result<Vec<QueryRow>> {
        let mut query_file =
            tempfile::NamedTempFile::new().map_err(|e| Error::Query(e.to_string()))?;
        query_file
            .write_all(sql.as_bytes())
            .map_err(|e| Error::Query(e.to_string()))?;

        let args = [
            "-q",
            path_must_str(query_file.path()),
            path_must_str(&self.trace),
        ];

        let out = run_cmd(&self.bin, &args)?;
        if !out.ok() {
            return Err(Error::Query(out.stderr_utf8_lossy().to_string()));
        }

        self.parse_output(&out.stdout)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cell_value_from_raw() {
        assert_eq!(CellValue::from_raw("12"), CellValue::Int(12));
        assert_eq!(CellValue::from_raw("-3"), CellValue::Int(-3));
        assert_eq!(CellValue::from_raw("1.5"), CellValue::Real(1.5));
        assert_eq!(CellValue::from_raw("[NULL]"), CellValue::Null);
        assert_eq!(
            CellValue::from_raw("StatusBar"),
            CellValue::Str("StatusBar".into())
        );
    }

    #[test]
    fn test_parse_output() {
        let tp = ExecTraceProcessor {
            bin: "trace_processor_shell".into(),
            trace: "unused".into(),
        };
        let raw = b"id,ts,name\n1,100,\"first\"\n2,200,[NULL]\n";
        let rows = tp.parse_output(raw).expect("parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].maybe_int("id"), Some(1));
        assert_eq!(rows[0].maybe_str("name"), Some("first"));
        assert_eq!(rows[1].maybe_int("ts"), Some(200));
        assert!(rows[1].get("name").is_some());
        assert_eq!(rows[1].maybe_str("name"), None);
    }

    #[test]
    fn test_must_int_names_missing_column() {
        let row = QueryRow::new(vec![("id".into(), CellValue::Int(7))]);
        assert_eq!(row.must_int("id").expect("id"), 7);
        let err = row.must_int("arg_set_id").expect_err("missing");
        assert!(err.to_string().contains("arg_set_id"));
    }
}
