use std::fmt::Display;

use serde_json::{json, Map, Value as JsonValue};

use super::datapoint::DataPoint;
use super::{Error, Result};

/// Identifies one sampled row of a time series: either an animation-clock
/// timestamp or a named supplemental marker such as `before`/`after`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameId {
    /// Milliseconds on the animation clock
    Timestamp(i64),
    Supplemental(String),
}

impl FrameId {
    pub fn supplemental<S: AsRef<str>>(name: S) -> Self {
        Self::Supplemental(name.as_ref().into())
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Timestamp(ms) => json!(ms),
            Self::Supplemental(name) => json!(name),
        }
    }

    pub fn from_json(value: &JsonValue) -> Result<Self> {
        if let Some(ms) = value.as_i64() {
            return Ok(Self::Timestamp(ms));
        }
        if let Some(name) = value.as_str() {
            return Ok(Self::Supplemental(name.into()));
        }
        Err(Error::MalformedDataPoint(format!(
            "invalid frame id: {}",
            value
        )))
    }
}

impl Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timestamp(ms) => write!(f, "{}ms", ms),
            Self::Supplemental(name) => write!(f, "{}", name),
        }
    }
}

/// One named column of a time series
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    name: String,
    data_points: Vec<DataPoint>,
}

impl Feature {
    pub fn new<N: AsRef<str>>(name: N, data_points: Vec<DataPoint>) -> Self {
        Self {
            name: name.as_ref().into(),
            data_points,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.data_points
    }
}

/// Sampled frame ids and the feature columns aligned to them by index.
///
/// The constructor enforces that every feature has exactly one data point per
/// frame id.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    frame_ids: Vec<FrameId>,
    features: Vec<Feature>,
}

impl TimeSeries {
    pub fn new(frame_ids: Vec<FrameId>, features: Vec<Feature>) -> Result<Self> {
        for feature in &features {
            if feature.data_points.len() != frame_ids.len() {
                return Err(Error::FeatureLengthMismatch {
                    feature: feature.name.clone(),
                    expected: frame_ids.len(),
                    actual: feature.data_points.len(),
                });
            }
        }
        Ok(Self {
            frame_ids,
            features,
        })
    }

    pub fn frame_ids(&self) -> &[FrameId] {
        &self.frame_ids
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_ids.is_empty()
    }

    /// The golden document shape:
    /// `{ "frames": [...], "features": { name: [datapoint...] } }`
    pub fn to_json(&self) -> JsonValue {
        let frames: Vec<JsonValue> = self.frame_ids.iter().map(|f| f.to_json()).collect();
        let mut features = Map::new();
        for feature in &self.features {
            let points: Vec<JsonValue> =
                feature.data_points.iter().map(|d| d.to_json()).collect();
            features.insert(feature.name.clone(), JsonValue::Array(points));
        }
        json!({ "frames": frames, "features": features })
    }

    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::MalformedDataPoint("golden document must be an object".into()))?;

        let frames = obj
            .get("frames")
            .and_then(|f| f.as_array())
            .ok_or_else(|| Error::MalformedDataPoint("golden document missing frames".into()))?;
        let frame_ids = frames
            .iter()
            .map(FrameId::from_json)
            .collect::<Result<Vec<_>>>()?;

        let mut features = Vec::new();
        if let Some(raw) = obj.get("features").and_then(|f| f.as_object()) {
            for (name, column) in raw {
                let points = column.as_array().ok_or_else(|| {
                    Error::MalformedDataPoint(format!("feature {} isn't an array", name))
                })?;
                let data_points = points
                    .iter()
                    .map(DataPoint::from_json)
                    .collect::<Result<Vec<_>>>()?;
                features.push(Feature::new(name, data_points));
            }
        }

        Self::new(frame_ids, features)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::motion::datapoint::FeatureValue;

    fn sample_series() -> TimeSeries {
        TimeSeries::new(
            vec![
                FrameId::supplemental("before"),
                FrameId::Timestamp(0),
                FrameId::Timestamp(16),
            ],
            vec![
                Feature::new(
                    "alpha",
                    vec![
                        DataPoint::Value(FeatureValue::Float(0.0)),
                        DataPoint::Value(FeatureValue::Float(0.5)),
                        DataPoint::Value(FeatureValue::Float(1.0)),
                    ],
                ),
                Feature::new(
                    "offset",
                    vec![
                        DataPoint::NotFound,
                        DataPoint::Value(FeatureValue::Int(10)),
                        DataPoint::Null,
                    ],
                ),
            ],
        )
        .expect("aligned series")
    }

    #[test]
    fn test_length_invariant() {
        let err = TimeSeries::new(
            vec![FrameId::Timestamp(0), FrameId::Timestamp(16)],
            vec![Feature::new("alpha", vec![DataPoint::Null])],
        )
        .expect_err("misaligned");
        assert!(err.to_string().contains("alpha"));
    }

    #[test]
    fn test_document_round_trip() {
        let series = sample_series();
        let back = TimeSeries::from_json(&series.to_json()).expect("round trip");
        assert_eq!(back, series);
    }

    #[test]
    fn test_frame_id_display() {
        assert_eq!(FrameId::Timestamp(16).to_string(), "16ms");
        assert_eq!(FrameId::supplemental("before").to_string(), "before");
    }
}
