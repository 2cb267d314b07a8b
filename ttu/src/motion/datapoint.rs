use std::collections::HashMap;
use std::fmt::Display;

use lazy_static::lazy_static;
use serde_json::{json, Value as JsonValue};

use super::{Error, Result};

/// A concrete captured value, tagged with its data point type
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Point { x: f64, y: f64 },
    Rect { left: f64, top: f64, right: f64, bottom: f64 },
}

impl FeatureValue {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Point { .. } => "point",
            Self::Rect { .. } => "rect",
        }
    }
}

impl Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{}", v),
            Self::Point { x, y } => write!(f, "({}, {})", x, y),
            Self::Rect {
                left,
                top,
                right,
                bottom,
            } => write!(f, "({}, {}) - ({}, {})", left, top, right, bottom),
        }
    }
}

/// One sample in a time series.
///
/// `NotFound` (the capture target was missing that frame) and `Null` (the
/// target was present and explicitly reported no value) are distinct states
/// and serialize differently.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPoint {
    Value(FeatureValue),
    NotFound,
    Null,
}

impl DataPoint {
    pub fn value(v: FeatureValue) -> Self {
        Self::Value(v)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Value(v) => v.type_tag(),
            Self::NotFound => "not_found",
            Self::Null => "null",
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::NotFound => json!({ "type": "not_found" }),
            Self::Value(v) => {
                let tp = data_point_type(v.type_tag()).expect("every variant is registered");
                json!({ "type": v.type_tag(), "value": tp.value_to_json(v) })
            }
        }
    }

    pub fn from_json(value: &JsonValue) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::Null);
        }
        let obj = value
            .as_object()
            .ok_or_else(|| Error::MalformedDataPoint(value.to_string()))?;
        let tag = obj
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| Error::MalformedDataPoint(value.to_string()))?;
        if tag == "not_found" {
            return Ok(Self::NotFound);
        }
        let tp = data_point_type(tag).ok_or_else(|| Error::UnknownDataPointType(tag.into()))?;
        let inner = obj
            .get("value")
            .ok_or_else(|| Error::MalformedDataPoint(value.to_string()))?;
        let parsed = tp
            .json_to_value(inner)
            .ok_or_else(|| Error::MalformedDataPoint(value.to_string()))?;
        Ok(Self::Value(parsed))
    }
}

impl Display for DataPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{}", v),
            Self::NotFound => write!(f, "not found"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Golden-comparison equality: same variant, same type, type-specific value
/// equality (exact unless the type overrides it)
pub fn data_points_equal(a: &DataPoint, b: &DataPoint) -> bool {
    match (a, b) {
        (DataPoint::Value(x), DataPoint::Value(y)) => {
            if x.type_tag() != y.type_tag() {
                return false;
            }
            data_point_type(x.type_tag())
                .map_or(false, |tp| tp.values_equal(x, y))
        }
        (DataPoint::NotFound, DataPoint::NotFound) => true,
        (DataPoint::Null, DataPoint::Null) => true,
        _ => false,
    }
}

/// A registered data point type: its wire tag, its JSON codec and its
/// equality.
///
/// `json_to_value(value_to_json(v))` must reproduce `v` exactly for every
/// representable value.
pub trait DataPointType: Send + Sync {
    fn tag(&self) -> &'static str;

    /// None when handed a value of a different type
    fn value_to_json(&self, value: &FeatureValue) -> Option<JsonValue>;

    /// None when the JSON doesn't decode into this type
    fn json_to_value(&self, json: &JsonValue) -> Option<FeatureValue>;

    /// Exact equality unless a type overrides it. No float tolerance is
    /// applied by default.
    fn values_equal(&self, a: &FeatureValue, b: &FeatureValue) -> bool {
        a == b
    }
}

struct BoolType;

impl DataPointType for BoolType {
    fn tag(&self) -> &'static str {
        "boolean"
    }

    fn value_to_json(&self, value: &FeatureValue) -> Option<JsonValue> {
        match value {
            FeatureValue::Bool(v) => Some(json!(v)),
            _ => None,
        }
    }

    fn json_to_value(&self, json: &JsonValue) -> Option<FeatureValue> {
        json.as_bool().map(FeatureValue::Bool)
    }
}

struct IntType;

impl DataPointType for IntType {
    fn tag(&self) -> &'static str {
        "int"
    }

    fn value_to_json(&self, value: &FeatureValue) -> Option<JsonValue> {
        match value {
            FeatureValue::Int(v) => Some(json!(v)),
            _ => None,
        }
    }

    fn json_to_value(&self, json: &JsonValue) -> Option<FeatureValue> {
        json.as_i64().map(FeatureValue::Int)
    }
}

struct FloatType;

impl DataPointType for FloatType {
    fn tag(&self) -> &'static str {
        "float"
    }

    fn value_to_json(&self, value: &FeatureValue) -> Option<JsonValue> {
        match value {
            FeatureValue::Float(v) => Some(json!(v)),
            _ => None,
        }
    }

    fn json_to_value(&self, json: &JsonValue) -> Option<FeatureValue> {
        json.as_f64().map(FeatureValue::Float)
    }
}

struct StringType;

impl DataPointType for StringType {
    fn tag(&self) -> &'static str {
        "string"
    }

    fn value_to_json(&self, value: &FeatureValue) -> Option<JsonValue> {
        match value {
            FeatureValue::Str(v) => Some(json!(v)),
            _ => None,
        }
    }

    fn json_to_value(&self, json: &JsonValue) -> Option<FeatureValue> {
        json.as_str().map(|s| FeatureValue::Str(s.into()))
    }
}

struct PointType;

impl DataPointType for PointType {
    fn tag(&self) -> &'static str {
        "point"
    }

    fn value_to_json(&self, value: &FeatureValue) -> Option<JsonValue> {
        match value {
            FeatureValue::Point { x, y } => Some(json!({ "x": x, "y": y })),
            _ => None,
        }
    }

    fn json_to_value(&self, json: &JsonValue) -> Option<FeatureValue> {
        let obj = json.as_object()?;
        Some(FeatureValue::Point {
            x: obj.get("x")?.as_f64()?,
            y: obj.get("y")?.as_f64()?,
        })
    }
}

struct RectType;

impl DataPointType for RectType {
    fn tag(&self) -> &'static str {
        "rect"
    }

    fn value_to_json(&self, value: &FeatureValue) -> Option<JsonValue> {
        match value {
            FeatureValue::Rect {
                left,
                top,
                right,
                bottom,
            } => Some(json!({
                "left": left,
                "top": top,
                "right": right,
                "bottom": bottom,
            })),
            _ => None,
        }
    }

    fn json_to_value(&self, json: &JsonValue) -> Option<FeatureValue> {
        let obj = json.as_object()?;
        Some(FeatureValue::Rect {
            left: obj.get("left")?.as_f64()?,
            top: obj.get("top")?.as_f64()?,
            right: obj.get("right")?.as_f64()?,
            bottom: obj.get("bottom")?.as_f64()?,
        })
    }
}

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, &'static dyn DataPointType> = {
        let types: [&'static dyn DataPointType; 6] = [
            &BoolType,
            &IntType,
            &FloatType,
            &StringType,
            &PointType,
            &RectType,
        ];
        types.iter().map(|t| (t.tag(), *t)).collect()
    };
}

/// Look up a registered data point type by its wire tag
pub fn data_point_type(tag: &str) -> Option<&'static dyn DataPointType> {
    REGISTRY.get(tag).copied()
}

#[cfg(test)]
mod test {
    use super::*;

    fn representative_values() -> Vec<FeatureValue> {
        vec![
            FeatureValue::Bool(true),
            FeatureValue::Bool(false),
            FeatureValue::Int(0),
            FeatureValue::Int(-42),
            FeatureValue::Int(i64::MAX),
            FeatureValue::Float(0.0),
            FeatureValue::Float(1.25),
            FeatureValue::Float(-123.456789),
            FeatureValue::Str(String::new()),
            FeatureValue::Str("offset".into()),
            FeatureValue::Point { x: 1.5, y: -2.5 },
            FeatureValue::Rect {
                left: 0.0,
                top: 0.0,
                right: 100.0,
                bottom: 50.0,
            },
        ]
    }

    #[test]
    fn test_round_trip_is_identity() {
        for value in representative_values() {
            let dp = DataPoint::Value(value);
            let back = DataPoint::from_json(&dp.to_json()).expect("round trip");
            assert_eq!(back, dp);
        }
    }

    #[test]
    fn test_sentinels_round_trip() {
        for dp in [DataPoint::NotFound, DataPoint::Null] {
            let back = DataPoint::from_json(&dp.to_json()).expect("sentinel round trip");
            assert_eq!(back, dp);
        }
    }

    #[test]
    fn test_sentinels_serialize_differently() {
        assert_ne!(DataPoint::NotFound.to_json(), DataPoint::Null.to_json());
        assert!(DataPoint::Null.to_json().is_null());
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let raw = serde_json::json!({ "type": "quaternion", "value": 1 });
        match DataPoint::from_json(&raw) {
            Err(Error::UnknownDataPointType(tag)) => assert_eq!(tag, "quaternion"),
            other => panic!("expected UnknownDataPointType, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_data_point() {
        assert!(DataPoint::from_json(&serde_json::json!(12)).is_err());
        assert!(DataPoint::from_json(&serde_json::json!({ "value": 12 })).is_err());
        assert!(
            DataPoint::from_json(&serde_json::json!({ "type": "int", "value": "x" })).is_err()
        );
    }

    #[test]
    fn test_equality_is_exact() {
        let a = DataPoint::Value(FeatureValue::Float(1.0));
        let b = DataPoint::Value(FeatureValue::Float(1.0 + 1e-9));
        assert!(!data_points_equal(&a, &b));
        assert!(data_points_equal(&a, &a.clone()));

        // different types never compare equal even with the same rendering
        let int_one = DataPoint::Value(FeatureValue::Int(1));
        let float_one = DataPoint::Value(FeatureValue::Float(1.0));
        assert!(!data_points_equal(&int_one, &float_one));

        assert!(data_points_equal(&DataPoint::NotFound, &DataPoint::NotFound));
        assert!(!data_points_equal(&DataPoint::NotFound, &DataPoint::Null));
    }
}
