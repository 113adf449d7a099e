//! Aggregate kinds and event classification
//!
//! Every aggregate log is identified by an [`AggregateKey`]: its kind (whose
//! discriminator token is written into the aggregate's `SessionName`) and a
//! canonical string value. Scene keys come from upload metadata, the other
//! three kinds come from classifying individual events.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::format::EventRecord;
use crate::Error;

/// Kind of aggregate log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Scene,
    StimulusType,
    EmotionLabel,
    FeatureName,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 4] = [
        AggregateKind::Scene,
        AggregateKind::StimulusType,
        AggregateKind::EmotionLabel,
        AggregateKind::FeatureName,
    ];

    /// `SessionName` token marking a log as an aggregate of this kind
    pub fn discriminator(self) -> &'static str {
        match self {
            AggregateKind::Scene => "#SCENENAMESESSION",
            AggregateKind::StimulusType => "#STIMULUSTYPESESSION",
            AggregateKind::EmotionLabel => "#EMOTIONLABELSESSION",
            AggregateKind::FeatureName => "#FEATURENAMESESSION",
        }
    }

    /// Reverse lookup from a discriminator token
    pub fn from_discriminator(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.discriminator() == token)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateKind::Scene => "scene",
            AggregateKind::StimulusType => "stimulus_type",
            AggregateKind::EmotionLabel => "emotion_label",
            AggregateKind::FeatureName => "feature_name",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.discriminator() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown aggregate kind: {}", s)))
    }
}

/// Per-event dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    StimulusType,
    EmotionLabel,
    FeatureName,
}

impl Dimension {
    pub fn aggregate_kind(self) -> AggregateKind {
        match self {
            Dimension::StimulusType => AggregateKind::StimulusType,
            Dimension::EmotionLabel => AggregateKind::EmotionLabel,
            Dimension::FeatureName => AggregateKind::FeatureName,
        }
    }
}

/// Value of a dimension: numeric for stimulus type and emotion label,
/// text for feature name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DimensionValue {
    Integer(i128),
    Text(String),
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionValue::Integer(n) => write!(f, "{}", n),
            DimensionValue::Text(s) => f.write_str(s),
        }
    }
}

/// One classification of an event
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DimensionKey {
    pub dimension: Dimension,
    pub value: DimensionValue,
}

impl DimensionKey {
    pub fn new(dimension: Dimension, value: DimensionValue) -> Self {
        Self { dimension, value }
    }

    /// Aggregate this key feeds
    pub fn aggregate_key(&self) -> AggregateKey {
        AggregateKey {
            kind: self.dimension.aggregate_kind(),
            value: self.value.to_string(),
        }
    }
}

/// Identity of one aggregate log for an owner
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregateKey {
    pub kind: AggregateKind,
    /// Canonical value: decimal for numeric dimensions, verbatim for text
    pub value: String,
}

impl AggregateKey {
    pub fn new(kind: AggregateKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn scene(scene_name: &str) -> Self {
        Self::new(AggregateKind::Scene, scene_name)
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.value)
    }
}

/// Classify an event into its dimension keys
///
/// At most one key per dimension; an event with no classification fields
/// yields the empty set.
pub fn classify(event: &EventRecord) -> BTreeSet<DimensionKey> {
    let mut keys = BTreeSet::new();

    if let Some(stimulus_type) = event.stimulus_type {
        keys.insert(DimensionKey::new(
            Dimension::StimulusType,
            DimensionValue::Integer(stimulus_type),
        ));
    }

    if let Some(label) = event.emotion_label {
        keys.insert(DimensionKey::new(
            Dimension::EmotionLabel,
            DimensionValue::Integer(label),
        ));
    }

    if let Some(feature_name) = &event.feature_name {
        keys.insert(DimensionKey::new(
            Dimension::FeatureName,
            DimensionValue::Text(feature_name.clone()),
        ));
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parse_event;

    fn keys_of(line: &str) -> Vec<DimensionKey> {
        classify(&parse_event(line).unwrap()).into_iter().collect()
    }

    #[test]
    fn test_discriminators_are_fixed() {
        assert_eq!(AggregateKind::Scene.discriminator(), "#SCENENAMESESSION");
        assert_eq!(AggregateKind::StimulusType.discriminator(), "#STIMULUSTYPESESSION");
        assert_eq!(AggregateKind::EmotionLabel.discriminator(), "#EMOTIONLABELSESSION");
        assert_eq!(AggregateKind::FeatureName.discriminator(), "#FEATURENAMESESSION");

        for kind in AggregateKind::ALL {
            assert_eq!(AggregateKind::from_discriminator(kind.discriminator()), Some(kind));
            assert_eq!(kind.as_str().parse::<AggregateKind>().unwrap(), kind);
        }
        assert_eq!(AggregateKind::from_discriminator("S1"), None);
        assert!("bogus".parse::<AggregateKind>().is_err());
    }

    #[test]
    fn test_classify_single_dimension() {
        assert_eq!(
            keys_of(r#"{"StimulusType":1}"#),
            vec![DimensionKey::new(Dimension::StimulusType, DimensionValue::Integer(1))]
        );
        assert_eq!(
            keys_of(r#"{"Emotion":{"Label":4}}"#),
            vec![DimensionKey::new(Dimension::EmotionLabel, DimensionValue::Integer(4))]
        );
        assert_eq!(
            keys_of(r#"{"FeatureName":"gaze"}"#),
            vec![DimensionKey::new(Dimension::FeatureName, DimensionValue::Text("gaze".into()))]
        );
    }

    #[test]
    fn test_classify_multiple_dimensions() {
        let keys = keys_of(r#"{"StimulusType":2,"Emotion":{"Label":0},"FeatureName":"blink"}"#);
        assert_eq!(keys.len(), 3);
        assert_eq!(
            keys.iter().map(|k| k.dimension).collect::<Vec<_>>(),
            vec![Dimension::StimulusType, Dimension::EmotionLabel, Dimension::FeatureName]
        );
    }

    #[test]
    fn test_classify_large_integers_stay_distinct() {
        let max_i64 = keys_of(r#"{"StimulusType":9223372036854775807}"#);
        let two_pow_63 = keys_of(r#"{"StimulusType":9223372036854775808}"#);
        let max_u64 = keys_of(r#"{"StimulusType":18446744073709551615}"#);

        assert_ne!(max_i64, two_pow_63);
        assert_eq!(
            two_pow_63[0].aggregate_key().value,
            "9223372036854775808"
        );
        assert_eq!(
            max_u64,
            vec![DimensionKey::new(
                Dimension::StimulusType,
                DimensionValue::Integer(i128::from(u64::MAX))
            )]
        );
        assert_eq!(keys_of(r#"{"StimulusType":9.223372036854775808e18}"#), two_pow_63);
    }

    #[test]
    fn test_classify_empty() {
        assert!(keys_of(r#"{"Timestamp":1}"#).is_empty());
        assert!(keys_of(r#"{"Emotion":null}"#).is_empty());
    }

    #[test]
    fn test_aggregate_key_canonical_value() {
        let key = DimensionKey::new(Dimension::EmotionLabel, DimensionValue::Integer(-3));
        assert_eq!(key.aggregate_key(), AggregateKey::new(AggregateKind::EmotionLabel, "-3"));

        let key = DimensionKey::new(Dimension::FeatureName, DimensionValue::Text("7".into()));
        assert_eq!(key.aggregate_key(), AggregateKey::new(AggregateKind::FeatureName, "7"));
        assert_eq!(key.aggregate_key().to_string(), "feature_name=7");

        assert_eq!(AggregateKey::scene("Forest").kind, AggregateKind::Scene);
    }
}
