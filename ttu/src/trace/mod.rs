use ttu_proc_macro::wraps_base_error;

pub mod processor;
pub use processor::{CellValue, ExecTraceProcessor, QueryRow, TraceProcessorSession};

pub mod args;
pub use args::{ArgValue, ArgsNode};

pub mod windowmanager;
pub mod layers;
pub mod transitions;

/// One timestamped snapshot inside an ordered trace
pub trait TraceEntry {
    fn elapsed_timestamp_nanos(&self) -> i64;
}

#[wraps_base_error]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field the schema requires was not present in the decoded rows
    #[error("required trace field missing: {0}")]
    MissingField(String),

    #[error("trace processor query failed: {0}")]
    Query(String),

    #[error("malformed trace processor output: {0}")]
    MalformedOutput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
