//! Event record decoding
//!
//! Event lines are semi-structured. Only three optional fields matter for
//! classification and each is decoded independently: a field that is
//! missing or has the wrong shape is treated as absent, it never fails the
//! whole record.

use serde_json::Value;
use thiserror::Error;

/// Why an event line could not be decoded
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event must be a JSON object")]
    NotAnObject,
}

/// Classification-relevant fields of one event line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRecord {
    /// `StimulusType`
    pub stimulus_type: Option<i128>,
    /// `Emotion.Label`
    pub emotion_label: Option<i128>,
    /// `FeatureName`
    pub feature_name: Option<String>,
}

impl EventRecord {
    /// Decode from an already parsed JSON value
    pub fn from_value(value: &Value) -> Result<Self, EventParseError> {
        let object = value.as_object().ok_or(EventParseError::NotAnObject)?;

        Ok(Self {
            stimulus_type: object.get("StimulusType").and_then(as_integer),
            emotion_label: object
                .get("Emotion")
                .and_then(Value::as_object)
                .and_then(|emotion| emotion.get("Label"))
                .and_then(as_integer),
            feature_name: object
                .get("FeatureName")
                .and_then(Value::as_str)
                .map(String::from),
        })
    }

    /// True when no classification field is present
    pub fn is_unclassified(&self) -> bool {
        self.stimulus_type.is_none() && self.emotion_label.is_none() && self.feature_name.is_none()
    }
}

/// Parse one event line
pub fn parse_event(line: &str) -> Result<EventRecord, EventParseError> {
    let value: Value = serde_json::from_str(line)?;
    EventRecord::from_value(&value)
}

/// 2^127 as f64; every integral float strictly inside (-2^127, 2^127) fits i128
const I128_BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// Integral JSON numbers, including floats with no fractional part (`1.0`)
///
/// Numbers compare by value: `2.0` and `2` give the same key, and so do
/// `9223372036854775808` and `9.223372036854775808e18`.
fn as_integer(value: &Value) -> Option<i128> {
    if let Some(n) = value.as_i64() {
        return Some(i128::from(n));
    }
    if let Some(n) = value.as_u64() {
        return Some(i128::from(n));
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f > -I128_BOUND && *f < I128_BOUND)
        .map(|f| f as i128)
}
