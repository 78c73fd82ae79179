use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Number of features in every input sample.
pub const NUM_FEATURES: usize = 4;

/// Number of classes every engine scores.
pub const NUM_CLASSES: usize = 3;

pub type FeatureVector = [f64; NUM_FEATURES];

pub type ProbabilityVector = [f64; NUM_CLASSES];

/// Per-sample mapping from label to raw score. Serialized as a JSON object
/// whose keys follow label registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMap(Vec<(String, f64)>);

impl ScoreMap {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self(entries)
    }
}

#[cfg(test)]
impl ScoreMap {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, score)| *score)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for ScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, score) in &self.0 {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}

/// A non-empty, ordered batch of samples. Only the validation layer builds one
/// from client input, so engines can rely on the shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch(Vec<FeatureVector>);

impl Batch {
    /// Returns `None` for an empty batch.
    pub fn new(samples: Vec<FeatureVector>) -> Option<Self> {
        if samples.is_empty() {
            None
        } else {
            Some(Self(samples))
        }
    }

    pub fn samples(&self) -> &[FeatureVector] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Which engine a unified-endpoint request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendSelector {
    Sklearn,
    Pytorch,
}

impl BackendSelector {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sklearn" => Some(Self::Sklearn),
            "pytorch" => Some(Self::Pytorch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sklearn => "sklearn",
            Self::Pytorch => "pytorch",
        }
    }
}

impl fmt::Display for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub prediction: Vec<String>,
    pub scores: Vec<ScoreMap>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct RootMessage {
    pub message: &'static str,
}
