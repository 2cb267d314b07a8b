use itertools::Itertools;

use crate::assertions::Fact;
use crate::motion::datapoint::{data_points_equal, DataPoint};
use crate::motion::timeseries::{FrameId, TimeSeries};

/// One differing sample between a golden and an actual time series
#[derive(Debug, Clone)]
pub struct ValueMismatch {
    pub frame_id: FrameId,
    pub feature: String,
    pub expected: DataPoint,
    pub actual: DataPoint,
}

/// The outcome of comparing an actual time series against a golden.
///
/// The three mismatch classes are mutually exclusive and checked in order:
/// frame ids first, then the feature set, then individual values. Once an
/// earlier class mismatches the later diffs are not computed, so a report
/// never mixes, say, missing frames with misaligned value noise.
#[derive(Debug, Clone)]
pub enum Comparison {
    Match,
    FrameMismatch {
        expected: Vec<FrameId>,
        actual: Vec<FrameId>,
        missing: Vec<FrameId>,
        unexpected: Vec<FrameId>,
    },
    FeatureMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    ValueMismatch(Vec<ValueMismatch>),
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    fn join<T: ToString>(items: &[T]) -> String {
        if items.is_empty() {
            return "(none)".into();
        }
        items.iter().map(|i| i.to_string()).join(", ")
    }

    /// Render the mismatch as itemized facts
    pub fn facts(&self) -> Vec<Fact> {
        match self {
            Self::Match => Vec::new(),
            Self::FrameMismatch {
                expected,
                actual,
                missing,
                unexpected,
            } => vec![
                Fact::new("expected frames", &Self::join(expected)),
                Fact::new("actual frames", &Self::join(actual)),
                Fact::new("missing frames", &Self::join(missing)),
                Fact::new("unexpected frames", &Self::join(unexpected)),
            ],
            Self::FeatureMismatch {
                missing,
                unexpected,
            } => vec![
                Fact::new("missing features", &Self::join(missing)),
                Fact::new("unexpected features", &Self::join(unexpected)),
            ],
            Self::ValueMismatch(mismatches) => mismatches
                .iter()
                .map(|m| {
                    Fact::new(
                        &format!("{} @ {}", m.feature, m.frame_id),
                        &format!(
                            "expected {} ({}), got {} ({})",
                            m.expected,
                            m.expected.type_tag(),
                            m.actual,
                            m.actual.type_tag()
                        ),
                    )
                })
                .collect(),
        }
    }
}

/// Compare an actual time series against the golden one
pub fn compare(golden: &TimeSeries, actual: &TimeSeries) -> Comparison {
    if golden.frame_ids() != actual.frame_ids() {
        let missing = golden
            .frame_ids()
            .iter()
            .filter(|f| !actual.frame_ids().contains(f))
            .cloned()
            .collect();
        let unexpected = actual
            .frame_ids()
            .iter()
            .filter(|f| !golden.frame_ids().contains(f))
            .cloned()
            .collect();
        return Comparison::FrameMismatch {
            expected: golden.frame_ids().to_vec(),
            actual: actual.frame_ids().to_vec(),
            missing,
            unexpected,
        };
    }

    let golden_names = golden.feature_names();
    let actual_names = actual.feature_names();
    let missing: Vec<String> = golden_names
        .iter()
        .filter(|n| !actual_names.contains(n))
        .map(|n| n.to_string())
        .collect();
    let unexpected: Vec<String> = actual_names
        .iter()
        .filter(|n| !golden_names.contains(n))
        .map(|n| n.to_string())
        .collect();
    if !missing.is_empty() || !unexpected.is_empty() {
        return Comparison::FeatureMismatch {
            missing,
            unexpected,
        };
    }

    let mut mismatches = Vec::new();
    for feature in golden.features() {
        let actual_feature = actual
            .feature(feature.name())
            .expect("feature sets already matched");
        for (i, (expected, got)) in feature
            .data_points()
            .iter()
            .zip(actual_feature.data_points())
            .enumerate()
        {
            if !data_points_equal(expected, got) {
                mismatches.push(ValueMismatch {
                    frame_id: golden.frame_ids()[i].clone(),
                    feature: feature.name().to_string(),
                    expected: expected.clone(),
                    actual: got.clone(),
                });
            }
        }
    }

    if mismatches.is_empty() {
        Comparison::Match
    } else {
        Comparison::ValueMismatch(mismatches)
    }
}
