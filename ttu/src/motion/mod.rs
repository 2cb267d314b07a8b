use ttu_proc_macro::wraps_base_error;

use crate::assertions::AssertionFailure;

pub mod datapoint;
pub use datapoint::{data_point_type, data_points_equal, DataPoint, DataPointType, FeatureValue};

pub mod timeseries;
pub use timeseries::{Feature, FrameId, TimeSeries};

pub mod sampling;
pub use sampling::AnimationSampling;

pub mod capture;
pub use capture::{read_exported_value, FeatureCapture, NodeMatcher, UiNode, UiSnapshot};

pub mod recorder;
pub use recorder::{AnimationDriver, MotionRecorder, RecordedMotion, Screenshot};

pub mod golden;
pub use golden::{compare, Comparison, GoldenStore, RecordedMotionSubject, ValueMismatch};

#[wraps_base_error]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no node matched {0}")]
    NodeNotFound(String),

    #[error("{count} nodes matched {matcher}, expected exactly one")]
    AmbiguousNode { matcher: String, count: usize },

    #[error("node {node} doesn't export a value for key `{key}`")]
    ValueNotExported { node: String, key: String },

    #[error("unknown data point type `{0}`")]
    UnknownDataPointType(String),

    #[error("malformed data point: {0}")]
    MalformedDataPoint(String),

    #[error("feature `{feature}` has {actual} data points for {expected} frames")]
    FeatureLengthMismatch {
        feature: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid sampling: {0}")]
    InvalidSampling(String),

    #[error("no golden recorded at {0}")]
    MissingGolden(String),

    #[error("invalid golden {path}: {reason}")]
    InvalidGolden { path: String, reason: String },

    #[error("golden mismatch:\n{0}")]
    GoldenMismatch(AssertionFailure),
}

pub type Result<T> = std::result::Result<T, Error>;
